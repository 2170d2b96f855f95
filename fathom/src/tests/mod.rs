
mod rhs;

mod ruleset;

mod selector;
