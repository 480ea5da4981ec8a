// Command layer: resolves the site and endpoint once, then runs one
// subcommand against it. Failures talking to the cluster are logged and
// end the command without an error exit; local problems (configuration,
// validation, files) propagate to `main`.

use crate::api::{find_job, ApiClient, SyncState};
use crate::cli::{Cli, ClusterCommand, Command, JobArgs, NewSiteArgs, SiteCommand};
use crate::config::{ConfigStore, Site};
use crate::cron::CronPattern;
use crate::error::{Error, Result};
use crate::logging::LogSettings;
use crate::selection::select_endpoint;
use crate::ui;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Entry point used by the binary.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let mut store = ConfigStore::open(&cli.config_file, true)?;

    match cli.command {
        Command::Site(command) => {
            LogSettings::for_site(None, cli.verbose).init()?;
            report_created(&store);
            run_site_command(&mut store, command)
        }
        Command::Cluster(command) => {
            let site = store
                .find_by_name(&cli.site_name)
                .cloned()
                .ok_or_else(|| Error::SiteNotFound(cli.site_name.clone()))?;
            LogSettings::for_site(Some(&site), cli.verbose).init()?;
            report_created(&store);

            let endpoint = select_endpoint(&site, &cli.selection)?;
            debug!(
                "using {} of site {} (selection: {})",
                endpoint, site.name, cli.selection
            );
            let api = ApiClient::new(endpoint, &site)?;
            settle(run_cluster_command(&api, command))
        }
    }
}

fn report_created(store: &ConfigStore) {
    if store.was_created() {
        info!("created default configuration at {}", store.path().display());
    }
}

/// Log cluster failures and swallow them; pass everything else on.
fn settle(result: Result<()>) -> anyhow::Result<()> {
    match result {
        Err(err @ Error::UnexpectedStatus { .. }) => {
            warn!("{}", err);
            Ok(())
        }
        Err(err @ Error::Remote(_)) => {
            error!("{}", err);
            Ok(())
        }
        other => Ok(other?),
    }
}

fn run_cluster_command(api: &ApiClient, command: ClusterCommand) -> Result<()> {
    match command {
        ClusterCommand::Status => status(api),
        ClusterCommand::Jobs => {
            ui::print_jobs(&api.jobs()?);
            Ok(())
        }
        ClusterCommand::Running => {
            ui::print_running(&api.jobs()?);
            Ok(())
        }
        ClusterCommand::Add {
            pattern,
            command,
            enabled,
        } => {
            let cron: CronPattern = pattern.parse()?;
            api.add_job(&cron, &command, enabled)?;
            info!(
                "successfully submitted job {} with pattern {} (enabled: {})",
                command, cron, enabled
            );
            Ok(())
        }
        ClusterCommand::Remove(job) => {
            let cron: CronPattern = job.pattern.parse()?;
            api.remove_job(&cron, &job.command)?;
            info!(
                "successfully submitted remove request {} with pattern {}",
                job.command, cron
            );
            Ok(())
        }
        ClusterCommand::Run(job) => {
            let cron: CronPattern = job.pattern.parse()?;
            api.run_job(&cron, &job.command)?;
            info!(
                "successfully submitted run request {} with pattern {}",
                job.command, cron
            );
            Ok(())
        }
        ClusterCommand::Kill(job) => {
            let cron: CronPattern = job.pattern.parse()?;
            api.kill_job(&cron, &job.command)?;
            info!(
                "successfully submitted kill request {} with pattern {}",
                job.command, cron
            );
            Ok(())
        }
        ClusterCommand::Details(job) => details(api, &job),
        ClusterCommand::Logs(job) => logs(api, &job),
        ClusterCommand::Export { file_name, force } => export(api, &file_name, force),
        ClusterCommand::Import { file_name } => import(api, &file_name),
    }
}

fn status(api: &ApiClient) -> Result<()> {
    let nodes = api.status()?;
    if nodes.is_empty() {
        error!("could not retrieve cluster state!");
    }

    ui::print_status_header(nodes.len());
    for node in &nodes {
        let Some(ip) = node.ip.as_deref() else {
            error!("could not find ip in state line: {:?}", node);
            continue;
        };
        match api.cron_in_sync(ip) {
            Ok(sync) => {
                ui::print_node(node, ip, Some(&sync));
                if let SyncState::OutOfSync(body) = &sync {
                    if !body.is_empty() {
                        warn!("{}", body);
                    }
                }
            }
            Err(e) => {
                ui::print_node(node, ip, None);
                error!("{}", e);
            }
        }
    }
    ui::print_status_footer();
    Ok(())
}

fn details(api: &ApiClient, job: &JobArgs) -> Result<()> {
    let cron: CronPattern = job.pattern.parse()?;
    let jobs = api.jobs()?;
    if jobs.is_empty() {
        println!("currently no jobs on the cluster");
        return Ok(());
    }
    let found = find_job(&jobs, &cron, &job.command).ok_or_else(|| Error::JobNotFound {
        pattern: cron.to_string(),
        command: job.command.clone(),
    })?;
    ui::print_job_details(&cron, &job.command, found);
    Ok(())
}

fn logs(api: &ApiClient, job: &JobArgs) -> Result<()> {
    let cron: CronPattern = job.pattern.parse()?;
    let jobs = api.jobs()?;
    if jobs.is_empty() {
        println!("currently no jobs on the cluster");
        return Ok(());
    }
    let found = find_job(&jobs, &cron, &job.command).ok_or_else(|| Error::JobNotFound {
        pattern: cron.to_string(),
        command: job.command.clone(),
    })?;
    let lines = found.log_lines();
    if lines.is_empty() {
        warn!("no logs for job matching {} {}", cron, job.command);
    } else {
        ui::print_job_logs(&cron, &job.command, &lines);
    }
    Ok(())
}

/// An export holding no jobs: an empty body, `null`, `[]` or `{}`.
fn export_is_empty(body: &[u8]) -> bool {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Null) => true,
        Ok(Value::Array(items)) => items.is_empty(),
        Ok(Value::Object(fields)) => fields.is_empty(),
        Ok(_) => false,
        Err(_) => body.iter().all(u8::is_ascii_whitespace),
    }
}

fn export(api: &ApiClient, file_name: &Path, force: bool) -> Result<()> {
    if file_name.exists() && !force {
        return Err(Error::ExportExists(file_name.to_path_buf()));
    }

    let spinner = ui::spinner("Exporting jobs...");
    let body = api.export();
    spinner.finish_and_clear();
    let body = body?;

    if export_is_empty(&body) {
        warn!("no jobs found for exporting");
        return Ok(());
    }
    debug!("got export data: {}", String::from_utf8_lossy(&body));

    if let Some(parent) = file_name.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(file_name, &body)?;
    info!("successfully written export to {}", file_name.display());
    Ok(())
}

fn import(api: &ApiClient, file_name: &Path) -> Result<()> {
    if !file_name.exists() {
        return Err(Error::ImportMissing(file_name.to_path_buf()));
    }
    let data: Value = serde_json::from_slice(&fs::read(file_name)?)?;
    api.import(&serde_json::to_string(&data)?)?;
    info!("successfully imported data");
    Ok(())
}

fn run_site_command(store: &mut ConfigStore, command: SiteCommand) -> anyhow::Result<()> {
    match command {
        SiteCommand::Ls => ui::print_site_names(store.sites()),
        SiteCommand::Add(args) => add_site(store, args)?,
        SiteCommand::Rm { name } => match store.remove(&name) {
            Some(_) => {
                store.save()?;
                info!("removed site {}", name);
            }
            None => warn!("site {} not found in configuration", name),
        },
        SiteCommand::Info { name } => {
            let site = store
                .find_by_name(&name)
                .ok_or_else(|| Error::SiteNotFound(name.clone()))?;
            ui::print_site(site);
        }
    }
    Ok(())
}

fn add_site(store: &mut ConfigStore, args: NewSiteArgs) -> anyhow::Result<()> {
    let servers: Vec<String> = args
        .servers
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if servers.is_empty() {
        warn!("site {} is added without servers", args.name);
    }

    let username = args.username.filter(|u| !u.is_empty());
    let password = match (&username, args.password) {
        (Some(_), Some(password)) => Some(password).filter(|p| !p.is_empty()),
        (Some(user), None) => ui::prompt_password(user)?,
        (None, _) => None,
    };

    let site = Site {
        name: args.name,
        servers,
        port: args.port,
        ssl: args.ssl,
        log_level: args.log_level,
        username,
        password,
    };
    let name = site.name.clone();

    match store.add(site) {
        Ok(()) => {
            store.save()?;
            info!("added site {}", name);
        }
        Err(err @ Error::DuplicateSite(_)) => warn!("{}", err),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_exports_are_detected() {
        assert!(export_is_empty(b""));
        assert!(export_is_empty(b"[]"));
        assert!(export_is_empty(b"{}"));
        assert!(export_is_empty(b"null"));
        assert!(!export_is_empty(br#"[{"command": "ls"}]"#));
        assert!(!export_is_empty(b"not json"));
    }

    #[test]
    fn settle_swallows_only_cluster_failures() {
        let remote = settle(Err(Error::UnexpectedStatus {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".into(),
        }));
        assert!(remote.is_ok());

        let local = settle(Err(Error::InvalidPattern("* *".into()))).unwrap_err();
        assert_eq!(
            local.downcast_ref::<Error>().map(Error::exit_code),
            Some(14)
        );
    }
}
