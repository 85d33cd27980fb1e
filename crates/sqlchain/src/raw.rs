//! Hand-written SQL with `?` markers.

use crate::buffer::{Buffer, Builder};
use crate::dialect::Dialect;
use crate::error::SqlResult;
use crate::param::{Param, ParamList};

/// A raw statement. Its `?` markers are rendered like any built statement.
#[derive(Debug, Clone, Default)]
pub struct Raw {
    pub query: String,
    pub values: ParamList,
}

impl Raw {
    pub fn new(query: impl Into<String>, values: impl IntoIterator<Item = Param>) -> Self {
        Self {
            query: query.into(),
            values: values.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }
}

impl Builder for Raw {
    fn build(&self, _dialect: &dyn Dialect, buf: &mut Buffer) -> SqlResult<()> {
        buf.write_str(&self.query);
        buf.write_values(self.values.iter().cloned());
        Ok(())
    }
}
