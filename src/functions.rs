//! Builtin function table.
//!
//! Arguments arrive as text; functions that need numbers parse them and
//! report `CallError::InvalidArgument` when they can't.

use crate::core::registry::RegistryBuilder;
use crate::error::CallError;
use crate::types::{Arguments, Parameter};

pub fn register_builtins(builder: &mut RegistryBuilder) {
    builder
        .register("Func1", vec![], |_| Ok("Out from func1".to_string()))
        .register(
            "Func2",
            vec![
                Parameter::required("param1"),
                Parameter::optional("param2", ""),
                Parameter::optional("status", "Okay"),
            ],
            |args| {
                Ok(format!(
                    "{} {}",
                    args.text_or_empty("param1"),
                    args.text_or_empty("param2")
                ))
            },
        )
        .register(
            "greet",
            vec![Parameter::required("name"), Parameter::optional("greeting", "hi")],
            |args| {
                Ok(format!(
                    "{}, {}",
                    args.text_or_empty("greeting"),
                    args.text_or_empty("name")
                ))
            },
        )
        .register("same", vec![Parameter::required("x")], |args| {
            Ok(args.text_or_empty("x").to_string())
        })
        .register("double", vec![Parameter::required("n")], |args| {
            let n = number(args, "n")?;
            Ok(format_number(n * 2.0))
        })
        .register(
            "add",
            vec![Parameter::required("a"), Parameter::required("b")],
            |args| Ok(format_number(number(args, "a")? + number(args, "b")?)),
        )
        .register("upper", vec![Parameter::required("text")], |args| {
            Ok(args.text_or_empty("text").to_uppercase())
        })
        .register("lower", vec![Parameter::required("text")], |args| {
            Ok(args.text_or_empty("text").to_lowercase())
        })
        .register("trim", vec![Parameter::required("text")], |args| {
            Ok(args.text_or_empty("text").trim().to_string())
        })
        .register("length", vec![Parameter::required("text")], |args| {
            Ok(args.text_or_empty("text").chars().count().to_string())
        })
        .register(
            "concat",
            vec![
                Parameter::required("left"),
                Parameter::required("right"),
                Parameter::absent("sep"),
            ],
            |args| {
                Ok(format!(
                    "{}{}{}",
                    args.text_or_empty("left"),
                    args.text_or_empty("sep"),
                    args.text_or_empty("right")
                ))
            },
        );
}

fn number(args: &Arguments, name: &str) -> Result<f64, CallError> {
    let raw = args
        .text(name)
        .ok_or_else(|| CallError::invalid(name, "", "value is required"))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| CallError::invalid(name, raw, "not a number"))
}

/// Format a number for display, removing unnecessary decimal places
pub fn format_number(n: f64) -> String {
    let rounded = (n * 1e6).round() / 1e6;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:.6}", rounded)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
