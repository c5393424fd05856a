//! Built-in Tools
//!
//! - `calculator` - arithmetic on two operands or a restricted expression
//! - `say_hello` - fixed greeting

mod calculator;
mod greeting;

pub use calculator::{CalculatorTool, evaluate_expression};
pub use greeting::SayHelloTool;

use crate::error::Result;
use crate::tool::ToolRegistry;

/// Registry holding every built-in tool
pub fn default_registry() -> Result<ToolRegistry> {
    let mut tools = ToolRegistry::new();
    tools.register(CalculatorTool)?;
    tools.register(SayHelloTool)?;
    Ok(tools)
}
