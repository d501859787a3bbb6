//! HTML rendering of the registration page.
//!
//! The page shows exactly one of two views: the form, or the issued ticket.

use crate::state::{RegistrationState, View};
use crate::ticket::Ticket;
use crate::types::{AvatarValue, FieldName, PriceTier, TicketQuantity};
use std::fmt::Write;

/// Escapes text for use in HTML content and attribute values
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders the full page for the current state
#[must_use]
pub fn render_page(state: &RegistrationState) -> String {
    let body = match (state.view, state.ticket.as_ref()) {
        (View::Ticket, Some(ticket)) => render_ticket(ticket, state.barcode_markup()),
        _ => render_form(state),
    };

    let mut page = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n\
         <meta charset=\"utf-8\">\n\
         <title>Tickets</title>\n\
         <link rel=\"icon\" href=\"/ticket-icon.png\">\n\
         </head>\n<body>\n<main class=\"page\">\n",
    );
    if let Some(alert) = &state.alert {
        let _ = writeln!(page, "<div class=\"alert\" role=\"alert\">{}</div>", escape_html(alert));
    }
    page.push_str(&body);
    page.push_str("</main>\n</body>\n</html>\n");
    page
}

fn field_error(state: &RegistrationState, field: FieldName) -> String {
    format!(
        "<p class=\"error\" data-field=\"{field}\">{}</p>\n",
        state.errors.message(field).map(escape_html).unwrap_or_default()
    )
}

fn render_form(state: &RegistrationState) -> String {
    let draft = &state.draft;
    let mut html = String::from("<form class=\"ticket-form\" method=\"post\">\n<h2>Conference Ticket Form</h2>\n");

    let _ = writeln!(
        html,
        "<label for=\"fullName\">Full Name</label>\n<input id=\"fullName\" name=\"fullName\" value=\"{}\">",
        escape_html(&draft.full_name)
    );
    html.push_str(&field_error(state, FieldName::FullName));

    let _ = writeln!(
        html,
        "<label for=\"email\">Email</label>\n<input id=\"email\" name=\"email\" type=\"email\" value=\"{}\">",
        escape_html(&draft.email)
    );
    html.push_str(&field_error(state, FieldName::Email));

    html.push_str(
        "<label for=\"avatar\">Upload Avatar</label>\n<input id=\"avatar\" name=\"avatar\" type=\"file\" accept=\"image/*\">\n",
    );
    match &draft.avatar {
        AvatarValue::Bound(handle) => {
            let _ = writeln!(html, "<p class=\"avatar-file\">{}</p>", escape_html(handle.file_name()));
        },
        AvatarValue::Placeholder(_) => {
            html.push_str("<p class=\"avatar-file\">Previously selected image</p>\n");
        },
        AvatarValue::None => {},
    }
    html.push_str(&field_error(state, FieldName::Avatar));

    html.push_str("<label>Select Ticket Type</label>\n<div class=\"tiers\">\n");
    for tier in PriceTier::ALL {
        let class = if draft.ticket_price == Some(tier) {
            "tier selected"
        } else {
            "tier"
        };
        let _ = writeln!(
            html,
            "<button type=\"button\" class=\"{class}\" name=\"ticketPrice\" value=\"{0}\">{0}</button>",
            escape_html(tier.label())
        );
    }
    html.push_str("</div>\n");
    html.push_str(&field_error(state, FieldName::TicketPrice));

    html.push_str("<label for=\"ticketQuantity\">Number of Tickets</label>\n<select id=\"ticketQuantity\" name=\"ticketQuantity\">\n");
    // Nothing is preselected, so an untouched select submits no quantity
    if draft.ticket_quantity.is_none() {
        html.push_str("<option value=\"\" selected disabled>Select quantity</option>\n");
    }
    for quantity in TicketQuantity::options() {
        let selected = if draft.ticket_quantity == Some(quantity) {
            " selected"
        } else {
            ""
        };
        let _ = writeln!(html, "<option value=\"{quantity}\"{selected}>{quantity}</option>");
    }
    html.push_str("</select>\n");
    html.push_str(&field_error(state, FieldName::TicketQuantity));

    html.push_str("<button type=\"submit\">Generate Ticket</button>\n</form>\n");
    html
}

fn render_ticket(ticket: &Ticket, barcode: Option<&str>) -> String {
    let mut html = String::from("<section class=\"ticket\">\n<h3>Your Ticket</h3>\n");
    let _ = writeln!(
        html,
        "<img src=\"{}\" alt=\"Avatar\" class=\"avatar\">",
        escape_html(&ticket.avatar().data_url())
    );
    let _ = writeln!(html, "<p class=\"name\">{}</p>", escape_html(ticket.full_name()));
    let _ = writeln!(html, "<p>{}</p>", escape_html(ticket.email()));
    let _ = writeln!(html, "<p>{}</p>", escape_html(ticket.tier().label()));
    let _ = writeln!(html, "<p>Tickets: {}</p>", ticket.quantity());
    if let Some(svg) = barcode {
        html.push_str(svg);
        html.push('\n');
    }
    html.push_str("</section>\n");
    html
}
