pub mod builder;
pub mod image;
pub mod op_code;
pub mod term_format;
pub mod validate;
