//! Application wiring: collaborators built from config and credentials, and
//! console command execution against one [`Session`].

use crate::assistant::llm::{ChatModel, MistralClient};
use crate::assistant::session::Session;
use crate::assistant::workflow::{ConfirmOutcome, DraftWorkflow, TurnOutcome};
use crate::config::AssistantConfig;
use crate::console::{Command, HELP};
use crate::credentials::LoadedCredentials;
use crate::error::Result;
use crate::notify::{BrevoMailer, Dispatcher, SmsGateway};
use crate::records::{Reminder, active_reminders, add_reminder, add_task};
use crate::scheduler::{
    DispatchLedger, ReminderScheduler, process_scheduler_started, start_process_scheduler,
};
use crate::store::{NotionStore, RecordStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Subject of the admin test email.
pub const TEST_EMAIL_SUBJECT: &str = "Test Agent";
/// Body of the admin test email.
pub const TEST_EMAIL_BODY: &str = "<h1>Ça marche !</h1>";
/// Text of the admin test SMS.
pub const TEST_SMS_TEXT: &str = "Test SMS";

/// Whether the console loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Lines to print after a command, plus loop control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub lines: Vec<String>,
    pub flow: Flow,
}

impl Reply {
    fn line(text: impl Into<String>) -> Self {
        Self {
            lines: vec![text.into()],
            flow: Flow::Continue,
        }
    }

    fn lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            flow: Flow::Continue,
        }
    }

    fn quit() -> Self {
        Self {
            lines: Vec::new(),
            flow: Flow::Quit,
        }
    }
}

/// Everything the console needs, shared with the background scheduler.
pub struct App {
    config: AssistantConfig,
    store: Arc<dyn RecordStore>,
    mailer: Arc<dyn Dispatcher>,
    sms: SmsGateway,
    workflow: DraftWorkflow,
    test_recipient: String,
}

impl App {
    /// Assemble an app from already-built collaborators.
    pub fn new(
        config: AssistantConfig,
        store: Arc<dyn RecordStore>,
        mailer: Arc<dyn Dispatcher>,
        model: Arc<dyn ChatModel>,
        sms: SmsGateway,
        test_recipient: impl Into<String>,
    ) -> Self {
        let workflow = DraftWorkflow::new(model, mailer.clone(), &config.organization.name);
        Self {
            config,
            store,
            mailer,
            sms,
            workflow,
            test_recipient: test_recipient.into(),
        }
    }

    /// Build the production collaborators (Notion, Brevo, Mistral, SMS webhook).
    ///
    /// # Errors
    ///
    /// Returns [`crate::AssistantError::Config`] if an HTTP client cannot be built.
    pub fn from_credentials(config: AssistantConfig, creds: &LoadedCredentials) -> Result<Self> {
        let store = NotionStore::new(
            &config.store,
            &creds.notion_key,
            &creds.tasks_database_id,
            &creds.reminders_database_id,
        )?;
        let mailer = BrevoMailer::new(&config.notify, &creds.brevo_key, &creds.sender_email)?;
        let model = MistralClient::new(&config.llm, &creds.mistral_api_key)?;
        let sms = SmsGateway::new(creds.sms_gateway_url.clone(), config.notify.timeout_secs)?;
        Ok(Self::new(
            config,
            Arc::new(store),
            Arc::new(mailer),
            Arc::new(model),
            sms,
            &creds.test_recipient,
        ))
    }

    #[must_use]
    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// A scheduler over this app's store and mailer, with the ledger if configured.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AssistantError::Scheduler`] if the ledger cannot be opened.
    pub fn build_scheduler(&self) -> Result<ReminderScheduler> {
        let scheduler = ReminderScheduler::new(
            self.store.clone(),
            self.mailer.clone(),
            &self.config.scheduler,
            self.config.organization.name.as_str(),
        );
        match &self.config.scheduler.ledger_path {
            Some(path) => Ok(scheduler.with_ledger(DispatchLedger::open(path)?)),
            None => Ok(scheduler),
        }
    }

    /// Start the process-wide scheduler unless disabled or already running.
    ///
    /// Returns `true` when this call started it. Once the scheduler runs,
    /// later calls return before building anything.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AssistantError::Scheduler`] if the ledger cannot be opened.
    pub fn start_scheduler(&self) -> Result<bool> {
        if !self.config.scheduler.enabled {
            info!("reminder scheduler disabled by configuration");
            return Ok(false);
        }
        if process_scheduler_started() {
            debug!("reminder scheduler already running");
            return Ok(false);
        }
        let scheduler = self.build_scheduler()?;
        Ok(start_process_scheduler(move || scheduler))
    }

    /// Execute one console command against `session`.
    pub async fn execute(&self, session: &mut Session, command: Command) -> Reply {
        match command {
            Command::Chat(prompt) => match self.workflow.submit(session, &prompt).await {
                TurnOutcome::Reply(_) | TurnOutcome::DraftReady(_) | TurnOutcome::Image { .. } => {
                    Reply::lines(Vec::new())
                }
                TurnOutcome::MalformedDraft(e) => Reply::lines(vec![
                    format!("⚠️ Brouillon illisible ({}).", e.reason),
                    format!("Texte reçu : {}", e.raw.trim()),
                ]),
                TurnOutcome::Failed { diagnostic } => {
                    Reply::line(format!("❌ Erreur assistant : {diagnostic}"))
                }
            },
            Command::Confirm => match self.workflow.confirm_pending(session).await {
                ConfirmOutcome::Sent { .. } => Reply::lines(Vec::new()),
                ConfirmOutcome::Failed { diagnostic } => Reply::line(format!(
                    "❌ Envoi impossible : {diagnostic}. Le brouillon est conservé."
                )),
                ConfirmOutcome::NoPendingDraft => Reply::line("Aucun brouillon en attente."),
            },
            Command::Cancel => {
                if self.workflow.cancel(session) {
                    Reply::line("Brouillon abandonné.")
                } else {
                    Reply::line("Aucun brouillon en attente.")
                }
            }
            Command::Edit { field, value } => {
                if session.edit_draft(field, value) {
                    Reply::line(format!("Champ {field} modifié."))
                } else {
                    Reply::line("Aucun brouillon en attente.")
                }
            }
            Command::Reset => {
                session.reset();
                Reply::line("Conversation effacée.")
            }
            Command::AddTask(task) => match add_task(self.store.as_ref(), &task).await {
                Ok(_) => Reply::line(format!("✅ Tâche ajoutée : {}", task.name)),
                Err(e) => {
                    warn!("task creation failed: {e}");
                    Reply::line(format!("❌ Tâche non enregistrée : {e}"))
                }
            },
            Command::AddReminder {
                message,
                recipient,
                day,
            } => {
                let recipient = recipient.unwrap_or_else(|| self.test_recipient.clone());
                let reminder = Reminder::new(message, recipient, day);
                match add_reminder(self.store.as_ref(), &reminder).await {
                    Ok(_) => Reply::line(format!(
                        "✅ Rappel programmé chaque {} pour {}",
                        reminder.day, reminder.recipient
                    )),
                    Err(e) => {
                        warn!("reminder creation failed: {e}");
                        Reply::line(format!("❌ Rappel non enregistré : {e}"))
                    }
                }
            }
            Command::ListReminders => self.list_reminders().await,
            Command::TestEmail => {
                let report = self
                    .mailer
                    .send(TEST_EMAIL_SUBJECT, TEST_EMAIL_BODY, &self.test_recipient)
                    .await;
                if report.success {
                    Reply::line(format!("Email OK ({})", self.test_recipient))
                } else {
                    Reply::line(format!("❌ Erreur email : {}", report.diagnostic))
                }
            }
            Command::TestSms(number) => {
                if !self.sms.is_configured() {
                    return Reply::line("Pas de passerelle SMS configurée.");
                }
                let report = self.sms.send_sms(&number, TEST_SMS_TEXT).await;
                if report.success {
                    Reply::line("SMS OK")
                } else {
                    Reply::line(format!("❌ Erreur SMS : {}", report.diagnostic))
                }
            }
            Command::Help => Reply::line(HELP),
            Command::Quit => Reply::quit(),
        }
    }

    async fn list_reminders(&self) -> Reply {
        match active_reminders(self.store.as_ref()).await {
            Ok(batch) if batch.reminders.is_empty() && batch.malformed.is_empty() => {
                Reply::line("Aucun rappel actif.")
            }
            Ok(batch) => {
                let mut lines: Vec<String> = batch
                    .reminders
                    .iter()
                    .map(|r| format!("📅 {} : {} → {}", r.day, r.message, r.recipient))
                    .collect();
                if !batch.malformed.is_empty() {
                    lines.push(format!(
                        "({} enregistrement(s) illisible(s) ignoré(s))",
                        batch.malformed.len()
                    ));
                }
                Reply::lines(lines)
            }
            Err(e) => {
                warn!("reminder listing failed: {e}");
                Reply::line(format!("❌ Rappels indisponibles : {e}"))
            }
        }
    }
}
