//! Integration tests for whole collection runs.
//!
//! These drive the orchestrator through the public API, from manifest bytes
//! to the final archive, and verify the run report along the way.

use std::fs;

use anyhow::Result;
use tempfile::TempDir;
use zip::read::ZipArchive;

use odc_collector::engine::{
    CollectionEvent, Orchestrator, RunContext, RunOptions, RunOutcome, RunState,
};
use odc_collector::manifest::BytesManifestSource;
use odc_collector::utils::archive::archive_file_name;

fn archive_names(path: &std::path::Path) -> Result<Vec<String>> {
    let mut archive = ZipArchive::new(fs::File::open(path)?)?;
    Ok((0..archive.len())
        .map(|i| archive.by_index(i).map(|entry| entry.name().to_string()))
        .collect::<Result<Vec<_>, _>>()?)
}

/// A full run over a namespaced manifest with environment variables in the
/// path patterns: files land in the archive, staging disappears.
#[test]
fn test_full_run_collects_files_into_the_archive() -> Result<()> {
    let sources = TempDir::new()?;
    fs::write(sources.path().join("app.log"), "application log")?;
    fs::write(sources.path().join("setup.log"), "setup log")?;
    fs::write(sources.path().join("System.evtx"), "event records")?;
    std::env::set_var("ODC_E2E_SOURCES", sources.path());

    let manifest = format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<Packages xmlns="urn:odc:manifest">
  <Package Id="Logs">
    <Files>
      <File Path="$ODC_E2E_SOURCES/*.log" Team="Support" />
    </Files>
    <EventLogs>
      <EventLog>{}/System.evtx</EventLog>
    </EventLogs>
  </Package>
</Packages>"#,
        sources.path().display()
    );

    let output = TempDir::new()?;
    let options = RunOptions {
        archive_dir: output.path().to_path_buf(),
        host_id: Some("E2EHOST".to_string()),
        ..RunOptions::default()
    };
    let (ctx, events) = RunContext::new();

    let result = Orchestrator::new(options).run(&BytesManifestSource::new(manifest), &ctx);
    drop(ctx);

    assert!(result.failure.is_none(), "{:?}", result.failure);
    assert!(!result.cancelled);

    let report = &result.packages["Logs"];
    assert_eq!(report.files_collected, 2);
    assert_eq!(report.event_logs_collected, 1);
    assert!(report.errors.is_empty());

    let archive_path = result.archive_path.as_deref().expect("archive path");
    assert!(archive_path.starts_with(output.path()));
    assert_eq!(
        archive_names(archive_path)?,
        vec![
            "Logs/EventLogs/General/E2EHOST_System.evtx",
            "Logs/Files/Support/E2EHOST_app.log",
            "Logs/Files/Support/E2EHOST_setup.log",
        ]
    );
    assert!(!output.path().join("staging").exists());

    let states: Vec<RunState> = events
        .iter()
        .filter_map(|event| match event {
            CollectionEvent::State(state) => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            RunState::Preparing,
            RunState::RunningPackages,
            RunState::Archiving,
            RunState::Finished(RunOutcome::Success),
        ]
    );

    Ok(())
}

/// Cancellation after the first package stops the run before the second,
/// produces no archive, and still removes staging.
#[test]
fn test_cancellation_between_packages() -> Result<()> {
    let manifest = br#"<Packages>
  <Package Id="First" />
  <Package Id="Second" />
  <Package Id="Third" />
</Packages>"#;

    let output = TempDir::new()?;
    let options = RunOptions {
        archive_dir: output.path().to_path_buf(),
        host_id: Some("CANCELHOST".to_string()),
        ..RunOptions::default()
    };
    let (ctx, events) = RunContext::rendezvous();
    let cancel = ctx.cancel.clone();

    let worker = Orchestrator::new(options)
        .spawn(BytesManifestSource::new(manifest.to_vec()), ctx)?;

    let mut seen = Vec::new();
    for event in events.iter() {
        if let CollectionEvent::PackageFinished { index: 0, .. } = &event {
            cancel.cancel();
        }
        seen.push(event);
    }
    let result = worker.join().expect("worker panicked");

    assert!(result.cancelled);
    assert!(result.archive_path.is_none());
    assert_eq!(result.packages.len(), 1, "only the first package ran");
    assert!(result.packages.contains_key("First"));
    assert!(!output.path().join("staging").exists());
    assert!(matches!(
        seen.last(),
        Some(CollectionEvent::State(RunState::Finished(RunOutcome::Cancelled)))
    ));
    assert!(!seen
        .iter()
        .any(|event| matches!(event, CollectionEvent::PackageStarted { index: 1, .. })));

    Ok(())
}

/// A broken action is recorded in the report while the rest of the package
/// still collects and the run still archives.
#[test]
fn test_action_failures_do_not_abort_the_run() -> Result<()> {
    let sources = TempDir::new()?;
    fs::write(sources.path().join("healthy.log"), "still here")?;

    let manifest = format!(
        r#"<Packages>
  <Package Id="Mixed">
    <Registries>
      <Registry Key="HKLM\SOFTWARE\Vendor" />
    </Registries>
    <Files>
      <File Path="{}/healthy.log" />
    </Files>
  </Package>
</Packages>"#,
        sources.path().display()
    );

    let output = TempDir::new()?;
    let options = RunOptions {
        archive_dir: output.path().to_path_buf(),
        host_id: Some("MIXEDHOST".to_string()),
        registry_tool: "/no/such/registry-tool".to_string(),
        ..RunOptions::default()
    };
    let (ctx, _events) = RunContext::new();

    let result = Orchestrator::new(options).run(&BytesManifestSource::new(manifest), &ctx);

    assert!(result.failure.is_none());
    let report = &result.packages["Mixed"];
    assert_eq!(report.files_collected, 1);
    assert_eq!(report.registries_collected, 0);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].detail.contains("failed to launch"));

    let archive_path = result.archive_path.as_deref().expect("archive path");
    assert_eq!(
        archive_names(archive_path)?,
        vec!["Mixed/Files/General/MIXEDHOST_healthy.log"]
    );

    Ok(())
}

/// Two runs in the same minute collide on the archive name; the second run
/// fails instead of overwriting, but its report survives.
#[test]
fn test_duplicate_archive_name_fails_the_run() -> Result<()> {
    let sources = TempDir::new()?;
    fs::write(sources.path().join("only.log"), "payload")?;

    let manifest = format!(
        r#"<Packages>
  <Package Id="Clash">
    <Files><File Path="{}/only.log" /></Files>
  </Package>
</Packages>"#,
        sources.path().display()
    );

    let output = TempDir::new()?;
    // Occupy the archive names for this minute and the next so the run
    // collides no matter when the minute ticks over.
    let now = chrono::Utc::now();
    for at in [now, now + chrono::Duration::minutes(1)] {
        fs::write(output.path().join(archive_file_name("CLASHHOST", &at)), "taken")?;
    }

    let options = RunOptions {
        archive_dir: output.path().to_path_buf(),
        host_id: Some("CLASHHOST".to_string()),
        ..RunOptions::default()
    };
    let (ctx, events) = RunContext::new();

    let result = Orchestrator::new(options).run(&BytesManifestSource::new(manifest), &ctx);
    drop(ctx);

    let failure = result.failure.as_deref().expect("run should fail");
    assert!(failure.contains("already exists"), "{failure}");
    assert!(result.archive_path.is_none());
    assert_eq!(result.packages["Clash"].files_collected, 1);
    assert!(!output.path().join("staging").exists());
    assert!(matches!(
        events.iter().last(),
        Some(CollectionEvent::State(RunState::Finished(RunOutcome::Failed)))
    ));

    Ok(())
}

/// Skip-marked commands execute for their side effects but leave nothing
/// in the archive; named commands do.
#[cfg(unix)]
#[test]
fn test_skip_commands_run_without_leaving_output() -> Result<()> {
    let markers = TempDir::new()?;
    let marker = markers.path().join("side-effect");

    let manifest = format!(
        r#"<Packages>
  <Package Id="Cmds">
    <Commands>
      <Command Type="PS" Output="skip">touch {}</Command>
      <Command Type="PS" Output="greeting">echo hello</Command>
    </Commands>
  </Package>
</Packages>"#,
        marker.display()
    );

    let output = TempDir::new()?;
    let options = RunOptions {
        archive_dir: output.path().to_path_buf(),
        host_id: Some("CMDHOST".to_string()),
        ..RunOptions::default()
    };
    let (ctx, _events) = RunContext::new();

    let result = Orchestrator::new(options).run(&BytesManifestSource::new(manifest), &ctx);

    assert!(result.failure.is_none());
    assert!(marker.is_file(), "skip command should still have run");
    let report = &result.packages["Cmds"];
    assert_eq!(report.commands_collected, 1);
    assert!(report.errors.is_empty());

    let archive_path = result.archive_path.as_deref().expect("archive path");
    assert_eq!(
        archive_names(archive_path)?,
        vec!["Cmds/Commands/General/CMDHOST_greeting.txt"]
    );

    Ok(())
}

/// End-to-end registry export through a stand-in tool, alongside commands.
#[cfg(unix)]
#[test]
fn test_registry_exports_through_the_configured_tool() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let tools = TempDir::new()?;
    let tool = tools.path().join("fakereg");
    fs::write(&tool, "#!/bin/sh\necho \"[$2]\" > \"$3\"\n")?;
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o755))?;

    let manifest = br#"<Packages>
  <Package Id="Reg">
    <Registries>
      <Registry Key="HKLM\SOFTWARE\Vendor\*" Team="Platform" />
    </Registries>
  </Package>
</Packages>"#;

    let output = TempDir::new()?;
    let options = RunOptions {
        archive_dir: output.path().to_path_buf(),
        host_id: Some("REGHOST".to_string()),
        registry_tool: tool.to_string_lossy().into_owned(),
        ..RunOptions::default()
    };
    let (ctx, _events) = RunContext::new();

    let result = Orchestrator::new(options).run(&BytesManifestSource::new(manifest.to_vec()), &ctx);

    assert!(result.failure.is_none());
    assert_eq!(result.packages["Reg"].registries_collected, 1);

    // The trailing wildcard is stripped from the exported key and the
    // output name is derived from the cleaned path.
    let archive_path = result.archive_path.as_deref().expect("archive path");
    let mut archive = ZipArchive::new(fs::File::open(archive_path)?)?;
    let mut body = String::new();
    {
        use std::io::Read;
        archive
            .by_name("Reg/RegistryKeys/Platform/REGHOST_HKLM_SOFTWARE_Vendor.txt")?
            .read_to_string(&mut body)?;
    }
    assert_eq!(body.trim(), "[HKLM\\SOFTWARE\\Vendor]");

    Ok(())
}
