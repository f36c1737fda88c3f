use anyhow::Result;

/// Print the generated OpenAPI document for the accounts API.
fn main() -> Result<()> {
    let spec = folioforge::api::openapi().to_pretty_json()?;
    println!("{spec}");
    Ok(())
}
