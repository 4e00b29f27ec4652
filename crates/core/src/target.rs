//! The deployment target every reconciliation step reads from.

use serde::{Deserialize, Serialize};

use crate::arguments::{Arguments, keys};
use crate::error::{Error, Result};

/// What to deploy and where.
///
/// Built once by the preparation step and handed to every later step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTarget {
    pub app_name: String,
    pub namespace: String,
    pub image: String,
    pub replicas: i32,
    pub config_map_name: String,
}

impl DeploymentTarget {
    /// Build a target from job arguments.
    ///
    /// # Errors
    ///
    /// Fails if any of `app-name`, `image-name`, `replicas`, `namespace` or
    /// `configmap` is missing or blank, or if `replicas` is not a
    /// non-negative integer.
    pub fn from_arguments(args: &Arguments) -> Result<Self> {
        Ok(Self {
            app_name: args.require(keys::APP_NAME)?.to_string(),
            namespace: args.require(keys::NAMESPACE)?.to_string(),
            image: args.require(keys::IMAGE_NAME)?.to_string(),
            replicas: parse_replicas(args.require(keys::REPLICAS)?)?,
            config_map_name: args.require(keys::CONFIG_MAP)?.to_string(),
        })
    }
}

fn parse_replicas(raw: &str) -> Result<i32> {
    let replicas = raw
        .trim()
        .parse::<i32>()
        .map_err(|e| Error::invalid_argument(keys::REPLICAS, format!("'{raw}': {e}")))?;
    if replicas < 0 {
        return Err(Error::invalid_argument(
            keys::REPLICAS,
            format!("'{raw}': must not be negative"),
        ));
    }
    Ok(replicas)
}
