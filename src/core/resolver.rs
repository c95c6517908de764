//! Argument resolution and call building.
//!
//! For each formal parameter, first match wins:
//! 1. the leftmost same-row column named like the parameter, if its cell is non-empty
//! 2. the parameter's declared default
//! 3. the session sentinel
//!
//! The row passed in is the live row, so values computed earlier in the
//! same row are visible here.

use crate::core::binder::Session;
use crate::core::registry::FunctionDescriptor;
use crate::error::CallError;
use crate::types::{ArgSource, ArgValue, Arguments};

pub struct ArgumentResolver<'a> {
    session: &'a Session,
}

impl<'a> ArgumentResolver<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub fn resolve(&self, function: &FunctionDescriptor, row: &[String]) -> Arguments {
        let mut args = Arguments::new();

        for param in &function.parameters {
            let from_column = self
                .session
                .column_named(&param.name)
                .and_then(|col| row.get(col).map(|cell| (col, cell)))
                .filter(|(_, cell)| !cell.is_empty());

            let (value, source) = match (from_column, &param.default) {
                (Some((col, cell)), _) => (ArgValue::Text(cell.clone()), ArgSource::Column(col)),
                (None, Some(default)) => (ArgValue::from(default), ArgSource::Default),
                (None, None) => (
                    ArgValue::Text(self.session.sentinel().to_string()),
                    ArgSource::Sentinel,
                ),
            };
            args.push(param.name.clone(), value, source);
        }

        args
    }

    /// Resolve arguments against `row` and invoke `function`
    pub fn call(&self, function: &FunctionDescriptor, row: &[String]) -> Result<String, CallError> {
        let args = self.resolve(function, row);
        function.invoke(&args)
    }
}
