//! Email bodies for operator notifications and sender confirmations
//!
//! All user-supplied text is HTML-escaped before it is interpolated.

use super::OutboundEmail;

const WRAPPER_STYLE: &str = "font-family: Arial, sans-serif; font-size: 16px; color: #333;";
const QUOTE_STYLE: &str = "border-left: 4px solid #ccc; padding-left: 16px; margin-left: 0;";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Escape, then turn line breaks into `<br>`
pub fn multiline(text: &str) -> String {
    escape_html(&text.replace("\r\n", "\n")).replace('\n', "<br>")
}

/// Chat-widget email form: operator notification plus sender confirmation
pub fn chat_message(operator: &str, sender: &str, message: &str) -> (OutboundEmail, OutboundEmail) {
    let from = escape_html(sender);
    let body = multiline(message);

    let notification = OutboundEmail::new(
        operator,
        format!("New Message from {sender}"),
        format!(
            "<div style=\"{WRAPPER_STYLE}\"><h2>New Chatbot Message</h2>\
             <p><strong>From:</strong> {from}</p><p><strong>Message:</strong></p>\
             <blockquote style=\"{QUOTE_STYLE}\">{body}</blockquote></div>"
        ),
    )
    .reply_to(sender);

    let confirmation = OutboundEmail::new(
        sender,
        "Thank you for your message!",
        format!(
            "<div style=\"{WRAPPER_STYLE}\"><h2>We've Received Your Message</h2><p>Hi there,</p>\
             <p>Thank you for contacting us. We have received your message and will get back to you as soon as possible.</p>\
             <p><strong>Your original message:</strong></p>\
             <blockquote style=\"{QUOTE_STYLE} background-color: #f9f9f9; padding: 10px;\">{body}</blockquote>\
             <p>Sincerely,<br>The Future&amp;More Inc. Team</p></div>"
        ),
    );

    (notification, confirmation)
}

/// Chat-widget callback form: operator notification only
pub fn callback_request(operator: &str, name: &str, phone: &str) -> OutboundEmail {
    OutboundEmail::new(
        operator,
        format!("Callback request from {name}"),
        format!(
            "<div style=\"{WRAPPER_STYLE}\"><h2>New Callback Request</h2>\
             <p><strong>Name:</strong> {}</p><p><strong>Phone:</strong> {}</p>\
             <p>Please call back within 24 hours.</p></div>",
            escape_html(name),
            escape_html(phone),
        ),
    )
}

/// Fields of the site's standalone contact form
#[derive(Debug, Clone)]
pub struct ContactSubmission<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub subject: &'a str,
    pub message: &'a str,
}

/// Contact page: operator notification plus submitter confirmation
pub fn contact_submission(operator: &str, form: &ContactSubmission<'_>) -> (OutboundEmail, OutboundEmail) {
    let name = escape_html(form.name);
    let subject = escape_html(form.subject);
    let body = multiline(form.message);

    let notification = OutboundEmail::new(
        operator,
        format!("New Contact Form Submission: {}", form.subject),
        format!(
            "<div style=\"font-family: Arial, sans-serif; line-height: 1.6;\">\
             <h2>New Contact Form Submission</h2>\
             <p>You have received a new message from your website's contact form.</p><hr>\
             <p><strong>Name:</strong> {name}</p><p><strong>Email:</strong> {}</p>\
             <p><strong>Subject:</strong> {subject}</p><h3>Message:</h3><p>{body}</p></div>",
            escape_html(form.email),
        ),
    )
    .reply_to(form.email)
    .sender_name("Contact Form");

    let confirmation = OutboundEmail::new(
        form.email,
        "We've Received Your Message!",
        format!(
            "<div style=\"font-family: Arial, sans-serif; line-height: 1.6;\">\
             <h2>Thank you for contacting us, {name}!</h2>\
             <p>We have successfully received your message and will get back to you as soon as possible.</p>\
             <p><strong>Here's a copy of your message:</strong></p>\
             <blockquote style=\"border-left: 4px solid #ccc; padding-left: 1em; margin-left: 1em; color: #555;\">\
             <p><strong>Subject:</strong> {subject}</p><p>{body}</p></blockquote>\
             <p>Best regards,<br>The Future &amp; More Team</p></div>"
        ),
    )
    .sender_name("Future & More Inc.");

    (notification, confirmation)
}
