use microdantic_derive::model_error;
use std::borrow::Cow;

#[model_error]
pub enum DemoError {
    #[error("Parse error{}: {source}", format_context(.context))]
    Parse {
        #[source]
        source: std::num::ParseIntError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Unknown model{}: {name}", format_context(.context))]
    UnknownModel { name: String, context: Option<Cow<'static, str>> },
}

fn parse(raw: &str) -> Result<i64, DemoError> {
    let value = raw.parse::<i64>().context("Parsing reading")?;
    Ok(value)
}

fn main() {
    assert!(parse("12").is_ok());
    assert_eq!(DemoError::UnknownModel { name: "A".into(), context: None }.kind(), "UnknownModel");
}
