//! Line-oriented console: command parsing and session rendering.

use crate::assistant::directive::looks_like_email;
use crate::assistant::session::{DraftField, Role, SessionView};
use crate::error::AssistantError;
use crate::records::{Frequency, Priority, Task, Weekday};
use std::fmt::Write as _;

/// Console help text.
pub const HELP: &str = "\
Commandes :
  <texte>                         discuter avec l'assistant
  /confirm                        envoyer le brouillon en attente
  /cancel                         abandonner le brouillon
  /edit <destinataire|sujet|corps> <valeur>
                                  modifier un champ du brouillon
  /reset                          effacer la conversation
  /task nom | responsable | priorité | fréquence
                                  ajouter une tâche
  /remind message | email | jour  programmer un rappel hebdomadaire
                                  (email vide : destinataire de test)
  /reminders                      lister les rappels actifs
  /test-email                     envoyer un email de test
  /test-sms <numéro>              envoyer un SMS de test
  /help                           cette aide
  /quit                           quitter";

/// One parsed console input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Chat(String),
    Confirm,
    Cancel,
    Edit { field: DraftField, value: String },
    Reset,
    AddTask(Task),
    /// `recipient` is `None` when the email field was left empty.
    AddReminder {
        message: String,
        recipient: Option<String>,
        day: Weekday,
    },
    ListReminders,
    TestEmail,
    TestSms(String),
    Help,
    Quit,
}

/// Parse one input line. `Err` carries a message for the user.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Chat(line.to_owned()));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match name {
        "confirm" => Ok(Command::Confirm),
        "cancel" => Ok(Command::Cancel),
        "reset" => Ok(Command::Reset),
        "reminders" => Ok(Command::ListReminders),
        "test-email" => Ok(Command::TestEmail),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        "edit" => parse_edit(args),
        "task" => parse_task(args),
        "remind" => parse_reminder(args),
        "test-sms" => {
            if args.is_empty() {
                Err("usage : /test-sms <numéro>".to_owned())
            } else {
                Ok(Command::TestSms(args.to_owned()))
            }
        }
        other => Err(format!("commande inconnue '/{other}' (voir /help)")),
    }
}

fn parse_edit(args: &str) -> Result<Command, String> {
    let usage = || "usage : /edit <destinataire|sujet|corps> <valeur>".to_owned();
    let (field, value) = args.split_once(char::is_whitespace).ok_or_else(usage)?;
    let field: DraftField = field.parse()?;
    let value = value.trim();
    if value.is_empty() {
        return Err(usage());
    }
    Ok(Command::Edit {
        field,
        value: value.to_owned(),
    })
}

fn split_fields(args: &str) -> Vec<&str> {
    args.split('|').map(str::trim).collect()
}

fn parse_task(args: &str) -> Result<Command, String> {
    let parts = split_fields(args);
    let (name, owner) = match parts.as_slice() {
        [name, owner, ..] if !name.is_empty() && !owner.is_empty() => (*name, *owner),
        _ => return Err("usage : /task nom | responsable | priorité | fréquence".to_owned()),
    };
    let priority = match parts.get(2).filter(|p| !p.is_empty()) {
        Some(p) => p.parse::<Priority>().map_err(|e| e.to_string())?,
        None => Priority::default(),
    };
    let frequency = match parts.get(3).filter(|f| !f.is_empty()) {
        Some(f) => f.parse::<Frequency>().map_err(|e| e.to_string())?,
        None => Frequency::default(),
    };
    Ok(Command::AddTask(Task {
        name: name.to_owned(),
        owner: owner.to_owned(),
        priority,
        frequency,
    }))
}

fn parse_reminder(args: &str) -> Result<Command, String> {
    let parts = split_fields(args);
    let [message, recipient, day] = parts.as_slice() else {
        return Err("usage : /remind message | email | jour".to_owned());
    };
    if message.is_empty() {
        return Err("le message du rappel est vide".to_owned());
    }
    let recipient = if recipient.is_empty() {
        None
    } else if looks_like_email(recipient) {
        Some((*recipient).to_owned())
    } else {
        return Err(format!("adresse invalide '{recipient}'"));
    };
    let day: Weekday = day.parse().map_err(|e: AssistantError| e.to_string())?;
    Ok(Command::AddReminder {
        message: (*message).to_owned(),
        recipient,
        day,
    })
}

/// Render a session: pending draft panel first, then the transcript.
#[must_use]
pub fn render(view: SessionView<'_>) -> String {
    let mut out = String::new();
    if let Some(draft) = view.draft_panel {
        let _ = writeln!(out, "┌─ Brouillon en attente ─────────────────");
        let _ = writeln!(out, "│ destinataire : {}", draft.recipient);
        let _ = writeln!(out, "│ sujet        : {}", draft.subject);
        let _ = writeln!(out, "│ corps        : {}", draft.body);
        let _ = writeln!(out, "└─ /confirm · /edit <champ> <valeur> · /cancel");
    }
    for message in view.transcript {
        let who = match message.role {
            Role::User => "vous",
            Role::Assistant => "assistant",
        };
        let _ = writeln!(out, "[{who}] {}", message.text);
        if let Some(url) = &message.image_url {
            let _ = writeln!(out, "        🖼  {url}");
        }
    }
    out
}
