//! Notify command implementation.

use crate::cli::args::{NotifyArgs, OutputFormat};
use crate::cli::output::CommandOutput;
use crate::core::models::{Attachment, EmailMessage};
use crate::core::services::Services;
use crate::error::Result;

/// Build the message described by `args`, reading body and attachments from disk.
///
/// # Errors
///
/// Returns an I/O error if a file cannot be read.
pub fn build_message(args: &NotifyArgs) -> Result<EmailMessage> {
    let html = match (&args.body, &args.body_file) {
        (Some(body), _) => body.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => String::new(),
    };
    let attachments = args
        .attachments
        .iter()
        .map(|path| Attachment::from_path(path))
        .collect::<Result<Vec<_>>>()?;

    let mut message =
        EmailMessage::new(&args.to, &args.subject, html).with_attachments(attachments);
    if let Some(name) = &args.sender_name {
        message = message.with_sender_name(name);
    }
    Ok(message)
}

/// Execute the notify command.
///
/// # Errors
///
/// Returns configuration errors for missing credentials, or the terminal
/// delivery error once retries are exhausted.
pub async fn execute(
    services: &Services,
    args: &NotifyArgs,
    format: OutputFormat,
    pretty: bool,
) -> Result<()> {
    args.validate()?;
    let notifier = services.notifier()?;
    let message = build_message(args)?;
    let attempts = args.max_retries.unwrap_or(notifier.policy().max_attempts);

    let receipt = notifier.send_with_retries(&message, attempts).await?;

    match format {
        OutputFormat::Json => CommandOutput::new("notify", receipt).print(pretty),
        OutputFormat::Human => {
            let id = receipt
                .message_id
                .as_deref()
                .map_or_else(String::new, |id| format!(", id {id}"));
            println!(
                "Sent to {} (HTTP {}, attempt {}{id})",
                message.to, receipt.status, receipt.attempts
            );
            Ok(())
        }
    }
}
