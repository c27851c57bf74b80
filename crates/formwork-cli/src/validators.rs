//! # Validators Subcommand
//!
//! Lists the registered validator types with the `params` keys each
//! accepts.

use anyhow::Result;
use formwork_forms::FormDescriptionContext;

/// One line per validator type: name, then its parameter keys.
pub fn validator_listing(ctx: &FormDescriptionContext) -> Vec<String> {
    ctx.definitions()
        .map(|(name, definition)| {
            let params = definition.param_names();
            if params.is_empty() {
                format!("{name:<14} (no params)")
            } else {
                format!("{name:<14} {}", params.join(", "))
            }
        })
        .collect()
}

/// Execute the validators subcommand.
pub fn run_validators() -> Result<u8> {
    let ctx = FormDescriptionContext::global();
    println!("Registered validator types:");
    println!();
    for line in validator_listing(ctx) {
        println!("  {line}");
    }
    println!();
    println!("Total: {} validator types", ctx.names().count());
    Ok(0)
}
