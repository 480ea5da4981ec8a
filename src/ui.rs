// UI layer: renders command results on stdout and handles the few
// interactive bits (password prompt, download spinner). Diagnostics go
// through `tracing` instead.

use crate::api::{value_text, Job, NodeState, SyncState};
use crate::config::Site;
use crate::cron::CronPattern;
use anyhow::Result;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use crossterm::style::{style, Color, Stylize};
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

const RULE: &str = "------------------------------------------------------";
const NODE_RULE: &str = "******************************************************";

/// Colour `text` when stdout is a terminal, leave it plain otherwise.
fn paint(text: &str, color: Color) -> String {
    if std::io::stdout().is_terminal() {
        style(text).with(color).to_string()
    } else {
        text.to_string()
    }
}

/// Spinner shown on stderr while a request is in flight. It hides itself
/// when stderr is not a terminal.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Ask for the password of `username` without echoing it. Returns `None`
/// when stdin is not interactive or the answer is empty.
pub fn prompt_password(username: &str) -> Result<Option<String>> {
    if !std::io::stdin().is_terminal() {
        return Ok(None);
    }
    let password: String = Password::new()
        .with_prompt(format!("Password for {}", username))
        .allow_empty_password(true)
        .interact()?;
    Ok(if password.is_empty() {
        None
    } else {
        Some(password)
    })
}

pub fn print_site_names(sites: &[Site]) {
    for site in sites {
        println!("{}", site.name);
    }
}

/// Every field of a site, credentials in clear text.
pub fn print_site(site: &Site) {
    println!("name      : {}", site.name);
    println!("servers   : {}", site.servers.join(", "));
    println!("port      : {}", site.port);
    println!("ssl       : {}", site.ssl);
    println!("log level : {}", site.log_level);
    println!("username  : {}", site.username.as_deref().unwrap_or(""));
    println!("password  : {}", site.password.as_deref().unwrap_or(""));
}

pub fn print_status_header(node_count: usize) {
    println!("{}", RULE);
    println!("{} nodes in cluster", node_count);
}

pub fn print_status_footer() {
    println!("{}", RULE);
}

/// One node block of `status`. `sync` is `None` when the node could not
/// be asked.
pub fn print_node(node: &NodeState, ip: &str, sync: Option<&SyncState>) {
    println!("{}", NODE_RULE);
    println!("ip           : {}", ip);
    match node.load {
        Some(load) => println!("load         : {:.2}%", load),
        None => println!("load         : -"),
    }
    println!("state        : {}", node.state.as_deref().unwrap_or("-"));
    println!(
        "communicated : {}",
        node.time.as_deref().map(format_time).unwrap_or_else(|| "-".to_string())
    );
    match sync {
        Some(SyncState::InSync) => println!("cron         : {}", paint("in sync", Color::Green)),
        Some(SyncState::OutOfSync(_)) => {
            println!("cron         : {}", paint("out of sync", Color::Red))
        }
        None => println!("cron         : unknown"),
    }
}

/// Render a server timestamp in local time as `YYYY-MM-DD HH:MM`.
/// Timestamps without an offset are taken as UTC; anything unparseable is
/// shown as sent.
pub fn format_time(raw: &str) -> String {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc())
        })
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|n| n.and_utc())
        });
    match parsed {
        Ok(dt) => dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

fn job_line(job: &Job) -> String {
    format!(
        "job [{}]: {} {}",
        job.assigned_to.as_deref().unwrap_or("-"),
        job.parts.as_deref().unwrap_or(""),
        job.command.as_deref().unwrap_or("")
    )
}

pub fn print_jobs(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("currently no jobs on the cluster");
        return;
    }
    for job in jobs {
        println!("{}", job_line(job));
    }
}

pub fn print_running(jobs: &[Job]) {
    let running: Vec<(&Job, String)> = jobs
        .iter()
        .filter_map(|job| job.running_pid().map(|pid| (job, pid)))
        .collect();
    if running.is_empty() {
        println!("currently no running jobs on the cluster");
        return;
    }
    for (job, pid) in running {
        println!("{}, running with pid {}", job_line(job), pid);
    }
}

pub fn print_job_details(pattern: &CronPattern, command: &str, job: &Job) {
    let opt = |v: &Option<serde_json::Value>| v.as_ref().map(value_text).unwrap_or_else(|| "-".into());

    println!("Job {} {} details:", pattern, command);
    println!("***********************************************");
    println!("- assigned to node: {}", job.assigned_to.as_deref().unwrap_or("-"));
    println!("- last run        : {}", opt(&job.last_run));
    println!(
        "- running pid     : {}",
        job.running_pid().unwrap_or_else(|| "-".into())
    );
    println!(
        "- enabled         : {}",
        job.enabled.map(|e| e.to_string()).unwrap_or_else(|| "-".into())
    );
    println!("- user            : {}", job.user.as_deref().unwrap_or("-"));
    println!("- cron            : {}", opt(&job.cron));
    if let Some(last) = job.log_lines().first() {
        println!("-----------------------------------------------");
        println!("last log: {}", last);
    }
    println!("***********************************************");
}

pub fn print_job_logs(pattern: &CronPattern, command: &str, lines: &[String]) {
    println!("Job {} {} logs:", pattern, command);
    println!("***********************************************");
    for line in lines {
        println!("{}", line);
    }
    println!("***********************************************");
}
