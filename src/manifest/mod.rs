// Re-export all items from the submodules
mod model;
mod parser;
mod source;

// Re-export the manifest data model
pub use model::{
    ActionSet,
    CommandAction,
    CommandKind,
    CommandOutput,
    EventLogAction,
    FileAction,
    Manifest,
    Package,
    RegistryAction,
};

// Re-export parsing and acquisition
pub use parser::parse;
pub use source::{BytesManifestSource, FileManifestSource, ManifestSource};

use anyhow::{Context, Result};
use log::info;
use std::path::Path;

/// A commented manifest showing every supported action kind.
pub const SAMPLE_MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!--
  Collection manifest.

  Each Package groups related diagnostics under an Id. Within a package,
  four action groups are supported and run in this order:

    Files      - copy every existing file matching a path pattern
    Registries - export a registry key with the system registry tool
    EventLogs  - copy event log files matching a path pattern
    Commands   - run a command line and capture its output

  Path patterns may use environment variables (%VAR% or $VAR) and a `*`
  wildcard. The optional Team attribute groups outputs into sub-folders
  (default "General"). Command Type is PS (shell, the default) or CMD
  (batch). Set Output="skip" to run a command without keeping its output.
-->
<Packages>
  <Package Id="Networking">
    <Files>
      <File Path="%windir%\debug\netlogon.log" Team="Networking" />
      <File Path="%windir%\Logs\NetSetup\*.log" Team="Networking" />
    </Files>
    <Registries>
      <Registry Key="HKLM\SYSTEM\CurrentControlSet\Services\Tcpip\Parameters\*" Team="Networking" />
    </Registries>
    <EventLogs>
      <EventLog Path="%windir%\System32\winevt\Logs\System.evtx" Team="Networking" />
    </EventLogs>
    <Commands>
      <Command Type="PS" Output="ip_config" Team="Networking">ipconfig /all</Command>
      <Command Type="CMD" Output="netstat" Team="Networking">netstat -ano</Command>
      <Command Type="PS" Output="skip">Remove-Item -Path $env:TEMP\scratch.txt -ErrorAction SilentlyContinue</Command>
    </Commands>
  </Package>
</Packages>
"#;

/// Writes the commented sample manifest to `path`.
pub fn write_sample_manifest(path: &Path) -> Result<()> {
    std::fs::write(path, SAMPLE_MANIFEST)
        .with_context(|| format!("Failed to write sample manifest to {}", path.display()))?;
    info!("Wrote sample manifest to {}", path.display());
    Ok(())
}
