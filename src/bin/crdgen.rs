//! Print every CRD served by the provider as a multi-document YAML stream.
//!
//! ```bash
//! cargo run --bin crdgen > package/crds.yaml
//! ```

use provider_gcp::all_crds;

fn main() -> anyhow::Result<()> {
    let docs = all_crds()
        .iter()
        .map(serde_yaml::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    print!("---\n{}", docs.join("---\n"));
    Ok(())
}
