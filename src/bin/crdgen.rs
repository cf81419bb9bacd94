//! # CRD Generator
//!
//! Prints the `DevOpsProject` and `Pipeline` CustomResourceDefinitions as a
//! multi-document YAML stream.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/devops.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use devops_controller::crd::{DevOpsProject, Pipeline};
use kube::core::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    let documents = [
        serde_yaml::to_string(&DevOpsProject::crd())?,
        serde_yaml::to_string(&Pipeline::crd())?,
    ];
    print!("{}", documents.join("---\n"));
    Ok(())
}
