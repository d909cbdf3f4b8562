// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::str::FromStr;

use anyhow::bail;
use url::Url;

/// A parsed absolute URL with a host.
#[derive(Clone, Debug)]
pub struct ValidUrl(Url);

impl ValidUrl {
    pub fn is_http(&self) -> bool {
        matches!(self.0.scheme(), "http" | "https")
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl FromStr for ValidUrl {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s)?;
        if url.host_str().is_none() {
            bail!("URL must contain a host");
        }
        Ok(ValidUrl(url))
    }
}

impl From<ValidUrl> for String {
    fn from(value: ValidUrl) -> Self {
        value.0.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_detection() {
        assert!(ValidUrl::from_str("https://relayer.testnet.zama.cloud")
            .unwrap()
            .is_http());
        assert!(!ValidUrl::from_str("wss://example.com").unwrap().is_http());
        assert!(ValidUrl::from_str("mailto:someone@example.com").is_err());
    }
}
