use url::Url;

use crate::error::Result;

const DEV_AZURE_HOST: &str = "dev.azure.com";
const VISUAL_STUDIO_SUFFIX: &str = ".visualstudio.com";

/// Maps an organization (collection) URL to its release management URL.
///
/// Hosted organizations serve releases from a separate `vsrm` host:
///
/// * `https://dev.azure.com/org` becomes `https://vsrm.dev.azure.com/org`
/// * `https://org.visualstudio.com` becomes `https://org.vsrm.visualstudio.com`
///
/// Any other host (on-premises servers) serves releases from the collection URL itself.
pub fn release_management_url(collection_uri: &str) -> Result<String> {
    let mut url = Url::parse(collection_uri)?;
    let host = url.host_str().unwrap_or_default().to_string();

    let release_host = if host == DEV_AZURE_HOST {
        Some(format!("vsrm.{host}"))
    } else {
        host.strip_suffix(VISUAL_STUDIO_SUFFIX)
            .filter(|org| !org.ends_with(".vsrm"))
            .map(|org| format!("{org}.vsrm{VISUAL_STUDIO_SUFFIX}"))
    };

    if let Some(release_host) = release_host {
        url.set_host(Some(&release_host))?;
    }

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_dev_azure_organizations() {
        assert_eq!(
            release_management_url("https://dev.azure.com/contoso/").unwrap(),
            "https://vsrm.dev.azure.com/contoso/"
        );
    }

    #[test]
    fn maps_visual_studio_organizations() {
        assert_eq!(
            release_management_url("https://contoso.visualstudio.com/").unwrap(),
            "https://contoso.vsrm.visualstudio.com/"
        );
    }

    #[test]
    fn leaves_release_hosts_alone() {
        assert_eq!(
            release_management_url("https://contoso.vsrm.visualstudio.com/").unwrap(),
            "https://contoso.vsrm.visualstudio.com/"
        );
    }

    #[test]
    fn leaves_on_premises_servers_alone() {
        assert_eq!(
            release_management_url("https://tfs.contoso.local/DefaultCollection/").unwrap(),
            "https://tfs.contoso.local/DefaultCollection/"
        );
    }

    #[test]
    fn rejects_invalid_urls() {
        assert!(release_management_url("contoso").is_err());
    }
}
