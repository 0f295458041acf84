pub mod fault;
pub mod function;
pub mod object;
pub mod value;
