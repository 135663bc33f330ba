//! CRD Generator
//!
//! Prints the WebApp CustomResourceDefinition as YAML.
//!
//! ```bash
//! cargo run -p crds --bin crdgen > config/crd/webapp.yaml
//! ```
//!
//! The cert-manager Certificate CRD is installed by cert-manager itself and
//! is not generated here.

use anyhow::Context;
use crds::WebApp;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crd = WebApp::crd();
    let yaml = serde_yaml::to_string(&crd).context("failed to serialize WebApp CRD")?;

    println!("# This file is auto-generated by crdgen");
    println!("# Edit crates/crds/src/web_app.rs instead");
    print!("{yaml}");

    Ok(())
}
