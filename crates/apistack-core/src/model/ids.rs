//! Stable resource id construction.
//!
//! Ids are derived only from declared names so that re-synthesizing the same
//! declarations yields the same ids (and the backend can reuse resources).
//! Gateway-owned ids are namespaced under the gateway's logical id.

use super::tree::HttpVerb;

fn path_key(path: &str) -> &str {
    if path == "/" {
        ""
    } else {
        path
    }
}

pub fn resource(gateway: &str, path: &str) -> String {
    format!("{gateway}/resource{}", path_key(path))
}

pub fn method(gateway: &str, path: &str, verb: HttpVerb) -> String {
    format!("{gateway}/method{}/{verb}", path_key(path))
}

pub fn documentation(gateway: &str, path: &str, verb: HttpVerb) -> String {
    format!("{gateway}/documentation{}/{verb}", path_key(path))
}

pub fn integration(gateway: &str, function: &str) -> String {
    format!("{gateway}/integration/{function}")
}

pub fn model(gateway: &str, name: &str) -> String {
    format!("{gateway}/model/{name}")
}

pub fn validator(gateway: &str, name: &str) -> String {
    format!("{gateway}/validator/{name}")
}

pub fn deployment(gateway: &str) -> String {
    format!("{gateway}/deployment")
}

/// The snapshot some backends create implicitly for a gateway.
pub fn latest_deployment(gateway: &str) -> String {
    format!("{gateway}/latest-deployment")
}

pub fn stage(gateway: &str, name: &str) -> String {
    format!("{gateway}/stage/{name}")
}

pub fn api_key(gateway: &str, name: &str) -> String {
    format!("{gateway}/api-key/{name}")
}

pub fn usage_plan(gateway: &str, name: &str) -> String {
    format!("{gateway}/usage-plan/{name}")
}
