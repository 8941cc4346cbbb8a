
/// The built-in CPIC-derived tables
pub mod builtin_tables;
/// Constants that are hard-coded into the built-in tables
pub mod guideline_const;
/// Contains the guideline table types, lookups, and validation
pub mod guideline_tables;
