use std::fs::read;
use std::path::Path;
use std::time::Duration;

use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use crate::load_generator::SimulatedMetric;
use crate::signer::DEFAULT_SERVICE;
use crate::{AmpErr, Result, CONFIG_ARG, ENDPOINT_ARG, REGION_ARG, TIMEOUT_ARG, WORKSPACE_ARG};

pub const DEFAULT_REGION: &str = "us-east-1";

/// Where and how the client talks to one workspace.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientOpts {
    workspace_id: Option<String>,
    region: String,
    service: String,
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl ClientOpts {
    pub fn new(workspace_id: &str, region: &str) -> ClientOpts {
        ClientOpts {
            workspace_id: Some(workspace_id.to_string()),
            region: region.to_string(),
            service: DEFAULT_SERVICE.to_string(),
            endpoint: None,
            timeout: None,
        }
    }

    /// Talk to `endpoint` directly instead of the region's managed endpoint.
    pub fn with_endpoint(endpoint: &str, region: &str) -> ClientOpts {
        ClientOpts {
            workspace_id: None,
            region: region.to_string(),
            service: DEFAULT_SERVICE.to_string(),
            endpoint: Some(endpoint.to_string()),
            timeout: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> ClientOpts {
        self.timeout = Some(timeout);
        self
    }

    pub fn service(mut self, service: &str) -> ClientOpts {
        self.service = service.to_string();
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn service_name(&self) -> &str {
        &self.service
    }

    pub fn workspace_id(&self) -> Option<&str> {
        self.workspace_id.as_deref()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Workspace base url, `<base>/api/v1/...` hangs off it.
    pub fn base_url(&self) -> Result<String> {
        if let Some(endpoint) = self.endpoint.as_ref() {
            return Ok(endpoint.trim_end_matches('/').to_string());
        }
        match self.workspace_id.as_ref() {
            Some(ws) if !ws.is_empty() => Ok(format!(
                "https://aps-workspaces.{}.amazonaws.com/workspaces/{}",
                self.region, ws
            )),
            _ => Err(AmpErr::ConfigErr("either a workspace id or an endpoint is required".to_string())),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ClientConfigFile {
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub interval_secs: Option<u64>,
    #[serde(default)]
    pub metrics: Option<Vec<SimulatedMetric>>,
}

impl ClientConfigFile {
    pub fn from_file(filepath: &Path) -> Result<ClientConfigFile> {
        let content = read(filepath)?;
        let config_file: ClientConfigFile = serde_yaml::from_slice(content.as_slice())?;
        Ok(config_file)
    }

    /// File given by `--config`, or an empty one.
    pub fn from_matches(matches: &ArgMatches) -> Result<ClientConfigFile> {
        match matches.value_of(CONFIG_ARG) {
            Some(path) => ClientConfigFile::from_file(Path::new(path)),
            None => Ok(ClientConfigFile::default()),
        }
    }
}

/// Resolve client options from the config file and the command line; flags win.
pub fn get_config(matches: &ArgMatches) -> Result<ClientOpts> {
    let file = ClientConfigFile::from_matches(matches)?;
    resolve(matches, file)
}

pub fn resolve(matches: &ArgMatches, file: ClientConfigFile) -> Result<ClientOpts> {
    let region = matches
        .value_of(REGION_ARG)
        .map(str::to_string)
        .or(file.region)
        .unwrap_or_else(|| DEFAULT_REGION.to_string());
    let workspace_id = matches.value_of(WORKSPACE_ARG).map(str::to_string).or(file.workspace_id);
    let endpoint = matches.value_of(ENDPOINT_ARG).map(str::to_string).or(file.endpoint);

    let mut opts = match (endpoint, workspace_id) {
        (Some(endpoint), workspace_id) => {
            let mut opts = ClientOpts::with_endpoint(&endpoint, &region);
            opts.workspace_id = workspace_id;
            opts
        }
        (None, Some(ws)) => ClientOpts::new(&ws, &region),
        (None, None) => {
            return Err(AmpErr::OptionErr(format!(
                "--{} or --{} is required",
                WORKSPACE_ARG, ENDPOINT_ARG
            )))
        }
    };
    if let Some(service) = file.service {
        opts = opts.service(&service);
    }
    let timeout_secs = match matches.value_of(TIMEOUT_ARG) {
        Some(raw) => Some(raw.parse::<u64>()?),
        None => file.timeout_secs,
    };
    if let Some(secs) = timeout_secs {
        opts = opts.timeout(Duration::from_secs(secs));
    }
    opts.base_url()?;
    Ok(opts)
}
