use crate::api::{ClientConfig, HrApi, HttpClient};
use crate::leave::LeaveRange;
use crate::model::{
    AdminDocumentQuery, Attachment, DocumentKind, ExpiryStatusFilter, InfoEvent, LoginRequest,
    WatchEvent,
};
use crate::notifications::{run_inbox_action, InboxAction};
use crate::orchestrator::{run_watch, WatchConfig};
use crate::scanner::ExpiryScanner;
use crate::session::{default_session_path, log_in, Session, SessionStore};
use crate::workflow::{SubmissionController, SubmissionForm, WorkflowError};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

/// Handle to the output writer; results go to stdout, status and alerts to stderr.
struct Output {
    tx: mpsc::UnboundedSender<OutputLine>,
    handle: tokio::task::JoinHandle<()>,
}

impl Output {
    fn spawn() -> Self {
        let (tx, handle) = spawn_output_writer();
        Self { tx, handle }
    }

    fn out(&self, line: impl Into<String>) {
        let _ = self.tx.send(OutputLine::Stdout(line.into()));
    }

    fn err(&self, line: impl Into<String>) {
        let _ = self.tx.send(OutputLine::Stderr(line.into()));
    }

    fn lines(&self, lines: impl IntoIterator<Item = String>) {
        for line in lines {
            self.out(line);
        }
    }

    async fn finish(self) {
        drop(self.tx);
        let _ = self.handle.await;
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "travel-docs",
    version,
    about = "Travel-document workflow client for the HR API"
)]
pub struct Cli {
    /// Base URL of the HR API
    #[arg(
        long,
        env = "TRAVEL_DOCS_API_URL",
        default_value = "http://localhost:5000/api",
        global = true
    )]
    pub api_url: String,

    /// Session file (defaults to the user config directory)
    #[arg(long, env = "TRAVEL_DOCS_SESSION", global = true)]
    pub session_file: Option<PathBuf>,

    /// Per-request timeout
    #[arg(long, default_value = "30s", global = true)]
    pub timeout: humantime::Duration,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Log in and store the session token
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "TRAVEL_DOCS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show your travel-document submission status
    Status {
        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Submit your travel documents (one time only)
    Submit(SubmitArgs),
    /// List employee travel documents (admin)
    Documents {
        #[arg(long, value_enum, default_value_t = ExpiryStatusFilter::All)]
        status: ExpiryStatusFilter,
        /// Search by name or document number
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check all documents once and raise expiry alerts (admin)
    Scan,
    /// Show expiring-document and unread-notification counters (admin)
    Badges,
    /// Keep polling counters and scanning for expiring documents until Ctrl-C (admin)
    Watch {
        /// Counter polling interval
        #[arg(long, default_value = "60s")]
        poll_interval: humantime::Duration,
        /// Rescan interval; without it documents are scanned once at start
        #[arg(long)]
        scan_interval: Option<humantime::Duration>,
    },
    /// List admin notifications, optionally marking them read (admin)
    Notifications {
        /// Mark the notification with this id as read
        #[arg(long, value_name = "ID", conflicts_with = "all_read")]
        read: Option<String>,
        /// Mark every notification as read
        #[arg(long)]
        all_read: bool,
        /// Print the inbox as JSON
        #[arg(long)]
        json: bool,
    },
    /// Count working days for a leave request, optionally applying for it
    Leave(LeaveArgs),
}

#[derive(Debug, Args, Clone, Default)]
pub struct SubmitArgs {
    /// Full name as printed on your documents
    #[arg(long)]
    pub full_name: Option<String>,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long)]
    pub date_of_birth: Option<String>,
    #[arg(long)]
    pub passport_number: Option<String>,
    /// Passport expiry date (YYYY-MM-DD)
    #[arg(long)]
    pub passport_expiry: Option<String>,
    /// Passport image or PDF scan, at most 5MB
    #[arg(long)]
    pub passport_image: Option<PathBuf>,
    #[arg(long)]
    pub visa_number: Option<String>,
    /// Visa expiry date (YYYY-MM-DD)
    #[arg(long)]
    pub visa_expiry: Option<String>,
    /// Visa image or PDF scan, at most 5MB
    #[arg(long)]
    pub visa_image: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct LeaveArgs {
    /// First day of leave (YYYY-MM-DD)
    #[arg(long)]
    pub start: String,
    /// Last day of leave (YYYY-MM-DD)
    #[arg(long)]
    pub end: String,
    /// Submit the request after checking the balance
    #[arg(long)]
    pub apply: bool,
    #[arg(long, default_value = "Casual Leave")]
    pub leave_type: String,
    /// Reason for the leave, required with --apply
    #[arg(long)]
    pub reason: Option<String>,
}

fn session_store(args: &Cli) -> Result<SessionStore> {
    let path = match args.session_file.clone() {
        Some(p) => p,
        None => default_session_path()?,
    };
    Ok(SessionStore::at(path))
}

/// Build an HTTP client, authenticated when `token` is given.
pub fn build_client(args: &Cli, token: Option<String>) -> Result<HttpClient> {
    HttpClient::new(&ClientConfig {
        base_url: args.api_url.clone(),
        token,
        timeout: Duration::from(args.timeout),
        user_agent: format!("travel-docs-cli/{}", env!("CARGO_PKG_VERSION")),
    })
}

fn authed_client(args: &Cli, store: &SessionStore) -> Result<(HttpClient, Session)> {
    let session = store.require()?;
    debug!(user = %session.user.username, role = %session.user.role, "using stored session");
    let client = build_client(args, Some(session.token.clone()))?;
    Ok((client, session))
}

fn admin_client(args: &Cli, store: &SessionStore) -> Result<(HttpClient, Session)> {
    let (client, session) = authed_client(args, store)?;
    if !session.user.is_admin() {
        bail!(
            "this command needs an admin account; logged in as {} ({})",
            session.user.username,
            session.user.role
        );
    }
    Ok((client, session))
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

pub async fn run(args: Cli) -> Result<()> {
    let store = session_store(&args)?;
    match args.command.clone() {
        Command::Login { username, password } => login(&args, &store, username, password).await,
        Command::Logout => logout(&store).await,
        Command::Status { json } => status(&args, &store, json).await,
        Command::Submit(submit_args) => submit(&args, &store, submit_args).await,
        Command::Documents {
            status,
            search,
            page,
            limit,
            json,
        } => {
            let query = AdminDocumentQuery {
                expiry_status: (status != ExpiryStatusFilter::All).then_some(status),
                search,
                page: Some(page.max(1)),
                limit: Some(limit),
            };
            documents(&args, &store, query, json).await
        }
        Command::Scan => scan(&args, &store).await,
        Command::Badges => badges(&args, &store).await,
        Command::Watch {
            poll_interval,
            scan_interval,
        } => {
            let cfg = WatchConfig {
                poll_interval: Duration::from(poll_interval),
                scan_interval: scan_interval.map(Duration::from),
            };
            watch(&args, &store, cfg).await
        }
        Command::Notifications {
            read,
            all_read,
            json,
        } => {
            let action = match (read, all_read) {
                (Some(id), _) => InboxAction::MarkRead(id),
                (None, true) => InboxAction::MarkAllRead,
                (None, false) => InboxAction::List,
            };
            notifications(&args, &store, action, json).await
        }
        Command::Leave(leave_args) => leave(&args, &store, leave_args).await,
    }
}

async fn login(args: &Cli, store: &SessionStore, username: String, password: String) -> Result<()> {
    let client = build_client(args, None)?;
    let session = log_in(&client, store, &LoginRequest { username, password }).await?;

    let output = Output::spawn();
    output.out(format!(
        "Logged in as {} ({})",
        session.user.username, session.user.role
    ));
    output.finish().await;
    Ok(())
}

async fn logout(store: &SessionStore) -> Result<()> {
    let output = Output::spawn();
    if store.clear()? {
        output.out("Logged out");
    } else {
        output.err("No active session");
    }
    output.finish().await;
    Ok(())
}

async fn status(args: &Cli, store: &SessionStore, json: bool) -> Result<()> {
    let (client, _) = authed_client(args, store)?;
    let output = Output::spawn();
    let mut ctl = SubmissionController::new(&client);
    output.err("Loading your document status...");
    let state = ctl.load().await;

    if json {
        output.out(serde_json::to_string_pretty(&serde_json::json!({
            "isSubmitted": state.is_submitted(),
            "record": state.record(),
        }))?);
    } else {
        output.lines(crate::text_summary::submission_lines(
            state,
            client.base_url(),
        ));
    }
    output.finish().await;
    Ok(())
}

async fn load_attachment(kind: DocumentKind, path: Option<&Path>) -> Result<Option<Attachment>> {
    match path {
        Some(p) => Ok(Some(Attachment::load(kind, p).await?)),
        None => Ok(None),
    }
}

async fn submit(args: &Cli, store: &SessionStore, submit_args: SubmitArgs) -> Result<()> {
    // Attachment checks run before any request.
    let passport_image =
        load_attachment(DocumentKind::Passport, submit_args.passport_image.as_deref()).await?;
    let visa_image = load_attachment(DocumentKind::Visa, submit_args.visa_image.as_deref()).await?;

    let (client, _) = authed_client(args, store)?;
    let output = Output::spawn();
    let mut ctl = SubmissionController::new(&client);
    output.err("Loading your document status...");
    ctl.load().await;

    if ctl.is_locked() {
        output.lines(crate::text_summary::submission_lines(
            ctl.state(),
            client.base_url(),
        ));
        output.finish().await;
        bail!("Documents have already been submitted and cannot be modified.");
    }

    let form = SubmissionForm {
        full_name_as_per_documents: submit_args.full_name.unwrap_or_default(),
        date_of_birth: submit_args.date_of_birth.unwrap_or_default(),
        passport_number: submit_args.passport_number.unwrap_or_default(),
        passport_expiry_date: submit_args.passport_expiry.unwrap_or_default(),
        visa_number: submit_args.visa_number.unwrap_or_default(),
        visa_expiry_date: submit_args.visa_expiry.unwrap_or_default(),
        passport_image,
        visa_image,
    };

    let result = ctl.submit(form).await;
    match &result {
        Ok(()) => output.err(
            "Travel documents submitted successfully! Your documents are now locked for editing.",
        ),
        Err(WorkflowError::AlreadySubmitted) => {
            output.err("Your documents were submitted from another session.")
        }
        Err(_) => {}
    }
    if ctl.is_locked() {
        output.lines(crate::text_summary::submission_lines(
            ctl.state(),
            client.base_url(),
        ));
    }
    output.finish().await;
    result.context("travel document submission failed")
}

async fn documents(
    args: &Cli,
    store: &SessionStore,
    query: AdminDocumentQuery,
    json: bool,
) -> Result<()> {
    let (client, _) = admin_client(args, store)?;
    let page = client
        .admin_travel_documents(&query)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message("Failed to fetch travel documents")))?;

    // Opening the listing counts as seeing the expiring-documents badge.
    if let Ok(count) = client.expiring_document_count().await {
        store.update_badge(|b| b.mark_viewed(count, now_rfc3339()))?;
    }

    let output = Output::spawn();
    if json {
        output.out(serde_json::to_string_pretty(&page)?);
    } else {
        output.lines(crate::text_summary::listing_lines(
            &page,
            query.page.unwrap_or(1),
            crate::expiry::today(),
        ));
    }
    output.finish().await;
    Ok(())
}

async fn scan(args: &Cli, store: &SessionStore) -> Result<()> {
    let (client, _) = admin_client(args, store)?;
    let mut scanner = ExpiryScanner::new();
    let report = scanner
        .scan(&client, crate::expiry::today())
        .await
        .context("Error checking for critical expiring documents")?;

    let output = Output::spawn();
    for alert in &report.alerts {
        output.err(alert.to_message());
    }
    output.lines(crate::text_summary::scan_lines(&report));
    output.finish().await;
    Ok(())
}

async fn badges(args: &Cli, store: &SessionStore) -> Result<()> {
    let (client, mut session) = admin_client(args, store)?;
    let snapshot = crate::badge::poll_badges(&client, &mut session.badge).await;
    store.save(&session)?;

    let output = Output::spawn();
    output.out(snapshot.to_message());
    output.finish().await;
    Ok(())
}

async fn watch(args: &Cli, store: &SessionStore, cfg: WatchConfig) -> Result<()> {
    let (client, _) = admin_client(args, store)?;
    let output = Output::spawn();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<WatchEvent>();

    let printer_tx = output.tx.clone();
    let printer = tokio::spawn(async move {
        while let Some(ev) = event_rx.recv().await {
            let line = match ev {
                WatchEvent::Alert(alert) => OutputLine::Stderr(alert.to_message()),
                WatchEvent::Badges(snapshot) => OutputLine::Stdout(snapshot.to_message()),
                WatchEvent::Info(info) => OutputLine::Stderr(info.to_message()),
            };
            let _ = printer_tx.send(line);
        }
    });

    let _ = event_tx.send(WatchEvent::Info(InfoEvent::Message(format!(
        "Watching {} (Ctrl-C to stop)",
        client.base_url()
    ))));
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    run_watch(&client, store, cfg, event_tx, shutdown).await;

    let _ = printer.await;
    output.finish().await;
    Ok(())
}

async fn notifications(
    args: &Cli,
    store: &SessionStore,
    action: InboxAction,
    json: bool,
) -> Result<()> {
    let (client, _) = admin_client(args, store)?;
    let view = run_inbox_action(&client, &action).await?;

    let output = Output::spawn();
    if let Some(confirmation) = view.confirmation {
        output.err(confirmation);
    }
    if json {
        output.out(serde_json::to_string_pretty(&view.notifications)?);
    } else {
        output.lines(crate::text_summary::inbox_lines(
            &view,
            crate::expiry::today(),
        ));
    }
    output.finish().await;
    Ok(())
}

async fn leave(args: &Cli, store: &SessionStore, leave_args: LeaveArgs) -> Result<()> {
    let parse = |field: &str, raw: &str| {
        crate::expiry::parse_wire_date(raw)
            .with_context(|| format!("{field} must be a date in YYYY-MM-DD form, got {raw:?}"))
    };
    let range = LeaveRange::new(
        parse("start", &leave_args.start)?,
        parse("end", &leave_args.end)?,
    );

    if !leave_args.apply {
        let output = Output::spawn();
        output.out(format!(
            "Number of working days: {} (weekends are excluded)",
            range.working_days()
        ));
        output.finish().await;
        return Ok(());
    }

    // Form checks happen before any request.
    let request = range.to_request(
        &leave_args.leave_type,
        leave_args.reason.as_deref().unwrap_or_default(),
    )?;
    let (client, _) = authed_client(args, store)?;
    let balance = crate::leave::apply_for_leave(&client, &request).await?;

    let output = Output::spawn();
    output.out(format!(
        "Number of working days: {} (weekends are excluded)",
        request.number_of_days
    ));
    output.err(format!(
        "Leave balance: total {} used {} remaining {}",
        balance.total_leaves, balance.used_leaves, balance.remaining_leaves
    ));
    output.out("Leave application submitted successfully");
    output.finish().await;
    Ok(())
}
