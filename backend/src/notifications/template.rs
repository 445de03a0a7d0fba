//! Message template rendering.
//!
//! Templates are admin-edited text with placeholder tokens. Substitution is
//! literal token replacement: tokens without a value are left in place so a
//! partially filled template still produces a deliverable message.

use chrono::{Datelike, NaiveDate};
use duetrack_shared::NotificationTemplate;

/// Per-customer values substituted into a template.
#[derive(Debug, Clone)]
pub struct TemplateVars {
    pub name: String,
    pub end_of_month: String,
    pub product_url: String,
}

/// Fully substituted message content for one customer.
#[derive(Debug, Clone)]
pub struct RenderedNotification {
    pub sms_body: String,
    pub email_subject: String,
    pub email_html: String,
}

/// Replace all placeholder tokens in a single template string.
pub fn render(template: &str, vars: &TemplateVars) -> String {
    template
        .replace("{{name}}", &vars.name)
        .replace("{{endOfMonth}}", &vars.end_of_month)
        .replace("{{product_url}}", &vars.product_url)
}

/// Render the full SMS + email content for one customer.
pub fn render_notification(
    template: &NotificationTemplate,
    vars: &TemplateVars,
) -> RenderedNotification {
    RenderedNotification {
        sms_body: render(&template.sms_body, vars),
        email_subject: render(&template.email_subject, vars),
        email_html: render(&template.email_html, vars),
    }
}

/// Last calendar day of the month containing `date`.
pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

/// Human-readable end-of-month date, e.g. "28 February".
pub fn format_end_of_month(date: NaiveDate) -> String {
    end_of_month(date).format("%-d %B").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn vars() -> TemplateVars {
        TemplateVars {
            name: "Ana".to_string(),
            end_of_month: "28 February".to_string(),
            product_url: "https://shop.example.com".to_string(),
        }
    }

    #[test]
    fn test_render_replaces_all_tokens() {
        let out = render(
            "Hi {{name}}, order by {{endOfMonth}} at {{product_url}}. Bye {{name}}!",
            &vars(),
        );
        assert_eq!(
            out,
            "Hi Ana, order by 28 February at https://shop.example.com. Bye Ana!"
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let template = "Hi {{name}}! Due: {{endOfMonth}}";
        assert_eq!(render(template, &vars()), render(template, &vars()));
    }

    #[test]
    fn test_unknown_tokens_left_in_place() {
        let out = render("Hi {{name}}, ref {{orderId}}", &vars());
        assert_eq!(out, "Hi Ana, ref {{orderId}}");
    }

    // The settings form advertises the snake_case token; only that exact
    // spelling is substituted.
    #[test]
    fn test_product_url_token_spelling() {
        let out = render("{{product_url}} vs {{productUrl}}", &vars());
        assert_eq!(out, "https://shop.example.com vs {{productUrl}}");
    }

    #[test]
    fn test_render_notification_covers_both_channels() {
        let template = NotificationTemplate {
            sms_body: "Hi {{name}}!".to_string(),
            sms_updated_at: Utc::now(),
            email_subject: "Reminder for {{name}}".to_string(),
            email_html: "<p>Visit {{product_url}}</p>".to_string(),
            email_updated_at: Utc::now(),
        };
        let rendered = render_notification(&template, &vars());
        assert_eq!(rendered.sms_body, "Hi Ana!");
        assert_eq!(rendered.email_subject, "Reminder for Ana");
        assert_eq!(rendered.email_html, "<p>Visit https://shop.example.com</p>");
    }

    #[test]
    fn test_end_of_month() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 20).unwrap();
        assert_eq!(
            end_of_month(date),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
        assert_eq!(format_end_of_month(date), "28 February");

        let december = NaiveDate::from_ymd_opt(2025, 12, 3).unwrap();
        assert_eq!(
            end_of_month(december),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );

        let leap = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(format_end_of_month(leap), "29 February");
    }
}
