pub mod resolve;
pub mod tac;
pub mod ty;
pub mod type_check;
