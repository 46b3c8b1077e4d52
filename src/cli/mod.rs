use crate::api::routes::reports::{ReportRequest, ReportResponse};
use crate::backend::BackendClient;
use crate::config::Config;
use crate::join;
use crate::metadata::Role;
use anyhow::{anyhow, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;

pub mod client;

pub use client::ServiceClient;

#[derive(Parser, Debug)]
#[command(name = "classroom")]
#[command(about = "Session engine for a live virtual classroom", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the session service for one room connection
    Serve(ServeArgs),
    /// Check a room and request an access token
    Join(JoinArgs),
    /// Show the running service's session state
    Status,
    /// Ask the running service to write a spreadsheet report
    Export(ExportArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Identity of the local participant
    #[arg(long)]
    pub identity: Option<String>,
    /// Room name
    #[arg(long, default_value = "classroom")]
    pub room: String,
    /// Participant metadata as issued with the token (JSON)
    #[arg(long, default_value = "")]
    pub metadata: String,
    /// Join as the teacher regardless of the metadata role
    #[arg(long)]
    pub teacher: bool,
}

impl ServeArgs {
    /// Metadata the session starts with.
    pub fn effective_metadata(&self) -> String {
        if self.teacher {
            crate::metadata::SessionMetadata::with_teacher_role(&self.metadata)
        } else {
            self.metadata.clone()
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleArg {
    Teacher,
    Student,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Teacher => Role::Teacher,
            RoleArg::Student => Role::Student,
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct JoinArgs {
    /// Room to join
    pub room: String,
    /// Display name
    #[arg(short, long)]
    pub name: String,
    /// Role to request the token for
    #[arg(long, value_enum, default_value = "student")]
    pub role: RoleArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Class,
    Quiz,
}

#[derive(ClapArgs, Debug)]
pub struct ExportArgs {
    /// Which report to write
    #[arg(value_enum)]
    pub kind: ReportKind,
    /// Output file or directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn handle_join_command(args: JoinArgs) -> Result<()> {
    let config = Config::load()?;
    let backend = BackendClient::new(&config.backend)?;

    let ticket = join::join(&backend, &args.room, &args.name, args.role.into())
        .await
        .map_err(|e| anyhow!("{}", e))?;

    println!("Joined {} as {} ({})", ticket.room, ticket.name, ticket.role);
    println!("Token: {}", ticket.token);
    if let Some(url) = &ticket.url {
        println!("Server: {}", url);
    }
    Ok(())
}

pub async fn handle_status_command() -> Result<()> {
    let config = Config::load()?;
    let client = ServiceClient::new(config.api.port);
    let state: Value = client.get("/state").await?;
    print!("{}", describe_state(&state));
    Ok(())
}

fn describe_state(state: &Value) -> String {
    let text = |key: &str| state.get(key).and_then(Value::as_str).unwrap_or("-");
    let list = |key: &str| state.get(key).and_then(Value::as_array).cloned().unwrap_or_default();
    let flag = |key: &str| state.get(key).and_then(Value::as_bool).unwrap_or(false);
    let mut out = String::new();

    if text("role") == "teacher" {
        out.push_str(&format!("{} teaching {} ({})\n", text("identity"), text("room"), text("topic")));
        let online = list("attendance")
            .iter()
            .filter(|a| a.get("status").and_then(Value::as_str) == Some("online"))
            .count();
        out.push_str(&format!("Online: {}\n", online));

        let pending = list("pending");
        out.push_str(&format!(
            "Pending doubts: {} ({} unanswered)\n",
            pending.len(),
            state.get("unread").and_then(Value::as_u64).unwrap_or(0)
        ));
        for doubt in &pending {
            out.push_str(&format!(
                "  [{}] {}: {}\n",
                doubt.get("id").map(|id| id.to_string().trim_matches('"').to_string()).unwrap_or_default(),
                doubt.get("name").and_then(Value::as_str).unwrap_or("?"),
                doubt.get("text").and_then(Value::as_str).unwrap_or(""),
            ));
        }

        let hands: Vec<String> = list("handQueue")
            .iter()
            .filter_map(|h| h.as_str().map(String::from))
            .collect();
        if !hands.is_empty() {
            out.push_str(&format!("Raised hands: {}\n", hands.join(", ")));
        }
        if let Some(stats) = state.get("quizResults").and_then(|r| r.get("stats")) {
            out.push_str(&format!(
                "Quiz submissions: {} (average {}%)\n",
                stats.get("totalSubmissions").and_then(Value::as_u64).unwrap_or(0),
                stats.get("averageScore").and_then(Value::as_f64).unwrap_or(0.0)
            ));
        }
    } else {
        out.push_str(&format!("{} in {}\n", text("identity"), text("room")));
        out.push_str(&format!(
            "Hand raised: {}\n",
            if flag("handRaised") { "yes" } else { "no" }
        ));
        if let Some(quiz) = state.get("quiz").filter(|q| !q.is_null()) {
            out.push_str(&format!(
                "Quiz: question {} ({}s left)\n",
                quiz.get("currentIndex").and_then(Value::as_u64).unwrap_or(0) + 1,
                quiz.get("timeLeft").and_then(Value::as_u64).unwrap_or(0)
            ));
        }
    }

    if flag("meetingEnded") {
        out.push_str("Meeting ended\n");
    }
    out
}

pub async fn handle_export_command(args: ExportArgs) -> Result<()> {
    let config = Config::load()?;
    let client = ServiceClient::new(config.api.port);
    let path = match args.kind {
        ReportKind::Class => "/reports/class",
        ReportKind::Quiz => "/reports/quiz",
    };

    let response: ReportResponse = client
        .post(path, &ReportRequest { output: args.output })
        .await?;
    println!("Report written to {}", response.path.display());
    Ok(())
}
