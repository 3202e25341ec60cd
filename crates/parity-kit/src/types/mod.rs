pub mod diagnostic_types;
pub mod diagnostics;
pub mod functions;
pub mod value;

#[cfg(test)]
mod tests;
