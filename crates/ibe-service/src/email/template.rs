//! Booking confirmation email.

use chrono::{Datelike, NaiveDate};

use ibe_core::{BookingError, BookingResult, Cart, Guest, PersonalData};

use super::EmailMessage;
use crate::config::HotelInfo;

const WEEKDAYS: [&str; 7] = [
    "Montag",
    "Dienstag",
    "Mittwoch",
    "Donnerstag",
    "Freitag",
    "Samstag",
    "Sonntag",
];

const MONTHS: [&str; 12] = [
    "Januar",
    "Februar",
    "März",
    "April",
    "Mai",
    "Juni",
    "Juli",
    "August",
    "September",
    "Oktober",
    "November",
    "Dezember",
];

/// Everything the confirmation shows.
#[derive(Debug, Clone)]
pub struct ConfirmationData {
    /// PMS booking id.
    pub booking_id: String,
    /// Reservation number.
    pub reservation_number: String,
    /// Booker.
    pub guest: PersonalData,
    /// Arrival.
    pub check_in: NaiveDate,
    /// Departure.
    pub check_out: NaiveDate,
    /// Adults.
    pub adults: u32,
    /// Children's ages.
    pub children_ages: Vec<u8>,
    /// Offer title, if an offer was booked.
    pub offer_title: Option<String>,
    /// Selected extras as (name, price, VAT %).
    pub services: Vec<(String, f64, f64)>,
    /// Total price.
    pub total: f64,
    /// Deposit paid.
    pub deposit: f64,
    /// Hotel contact.
    pub hotel: HotelInfo,
}

impl ConfirmationData {
    /// Collect confirmation data from the cart and the PMS result.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidCart` without guest or stay data.
    pub fn new(cart: &Cart, result: &BookingResult, hotel: &HotelInfo) -> Result<Self, BookingError> {
        let guest = cart.personal()?.clone();
        let search = cart.search()?;

        Ok(Self {
            booking_id: result.booking_id.clone(),
            reservation_number: result.reservation_number.clone(),
            guest,
            check_in: search.start_date,
            check_out: search.end_date,
            adults: search.adults,
            children_ages: search.children_ages.clone(),
            offer_title: cart.offer.as_ref().map(|o| o.title.clone()),
            services: cart
                .selected_services()
                .map(|s| (s.name.clone(), s.price, s.vat))
                .collect(),
            total: cart.calculated_amounts.total.gross,
            deposit: cart.calculated_amounts.deposit.gross,
            hotel: hotel.clone(),
        })
    }
}

/// Long German date, e.g. `Dienstag, 1. Juli 2025`.
#[must_use]
pub fn german_long_date(date: NaiveDate) -> String {
    format!(
        "{}, {}. {} {}",
        WEEKDAYS[date.weekday().num_days_from_monday() as usize],
        date.day(),
        MONTHS[date.month0() as usize],
        date.year()
    )
}

/// Euro amount with a decimal comma, e.g. `129,00 €`.
#[must_use]
pub fn euro(amount: f64) -> String {
    format!("{amount:.2} €").replace('.', ",")
}

/// Escape text for HTML element content and attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn guest_line(guest: &Guest) -> String {
    match (guest.is_child, guest.age) {
        (true, Some(age)) => format!("{} {} (Kind, {age} Jahre)", guest.first_name, guest.last_name),
        (true, None) => format!("{} {} (Kind)", guest.first_name, guest.last_name),
        _ => format!("{} {}", guest.first_name, guest.last_name),
    }
}

fn children_line(ages: &[u8]) -> String {
    if ages.is_empty() {
        return "0".into();
    }
    let ages: Vec<String> = ages.iter().map(ToString::to_string).collect();
    format!("{} (Alter: {})", ages.len(), ages.join(", "))
}

/// Subject line.
#[must_use]
pub fn subject(data: &ConfirmationData) -> String {
    format!(
        "Booking Confirmation #{} - {}",
        data.reservation_number, data.hotel.name
    )
}

/// Plain-text body.
#[must_use]
pub fn render_text(data: &ConfirmationData) -> String {
    let guest = &data.guest;
    let mut out = format!(
        "Vielen Dank für Ihre Buchung, {}!\n\n\
         Buchungsnummer: {}\n\
         Reservierungsnummer: {}\n\n\
         Anreise: {}\n\
         Abreise: {}\n\
         Erwachsene: {}\n\
         Kinder: {}\n",
        guest.full_name(),
        data.booking_id,
        data.reservation_number,
        german_long_date(data.check_in),
        german_long_date(data.check_out),
        data.adults,
        children_line(&data.children_ages),
    );

    out.push_str(&format!(
        "\nHauptgast:\n{}\n{}\n{}\n{} {}\n",
        guest.full_name(),
        guest.email,
        guest.street,
        guest.zip_code,
        guest.city.as_deref().unwrap_or_default(),
    ));
    if let Some(phone) = &guest.phone {
        out.push_str(&format!("{phone}\n"));
    }

    if !guest.additional_guests.is_empty() {
        out.push_str("\nWeitere Gäste:\n");
        for g in &guest.additional_guests {
            out.push_str(&format!("- {}\n", guest_line(g)));
        }
    }

    if let Some(title) = &data.offer_title {
        out.push_str(&format!("\nAngebot: {title}\n"));
    }

    if !data.services.is_empty() {
        out.push_str("\nZusatzleistungen:\n");
        for (name, price, vat) in &data.services {
            out.push_str(&format!("- {name}: {} (inkl. {vat}% MwSt)\n", euro(*price)));
        }
    }

    out.push_str(&format!(
        "\nGesamtpreis: {}\nAnzahlung: {}\n",
        euro(data.total),
        euro(data.deposit)
    ));

    if let Some(comments) = guest.comments.as_deref().filter(|c| !c.trim().is_empty()) {
        out.push_str(&format!("\nIhre Anmerkungen:\n{comments}\n"));
    }

    out.push_str(&format!(
        "\n{}\n{}\nTel. {}\n{}\n",
        data.hotel.name, data.hotel.address, data.hotel.phone, data.hotel.email
    ));

    out
}

fn row(label: &str, value: &str) -> String {
    format!(
        "<tr><td style=\"padding:4px 12px 4px 0;color:#666\">{}</td><td style=\"padding:4px 0\">{}</td></tr>",
        escape_html(label),
        escape_html(value)
    )
}

/// HTML body.
#[must_use]
pub fn render_html(data: &ConfirmationData) -> String {
    let guest = &data.guest;
    let mut html = String::from(
        "<!DOCTYPE html><html><body style=\"font-family:Arial,sans-serif;color:#222\">",
    );

    html.push_str(&format!(
        "<h1>Vielen Dank für Ihre Buchung, {}!</h1><table>",
        escape_html(&guest.full_name())
    ));
    html.push_str(&row("Buchungsnummer", &data.booking_id));
    html.push_str(&row("Reservierungsnummer", &data.reservation_number));
    html.push_str(&row("Anreise", &german_long_date(data.check_in)));
    html.push_str(&row("Abreise", &german_long_date(data.check_out)));
    html.push_str(&row("Erwachsene", &data.adults.to_string()));
    html.push_str(&row("Kinder", &children_line(&data.children_ages)));
    if let Some(title) = &data.offer_title {
        html.push_str(&row("Angebot", title));
    }
    html.push_str("</table>");

    html.push_str("<h2>Hauptgast</h2><p>");
    html.push_str(&escape_html(&guest.full_name()));
    html.push_str("<br>");
    html.push_str(&escape_html(&guest.email));
    html.push_str("<br>");
    html.push_str(&escape_html(&format!(
        "{}, {} {}",
        guest.street,
        guest.zip_code,
        guest.city.as_deref().unwrap_or_default()
    )));
    html.push_str("</p>");

    if !guest.additional_guests.is_empty() {
        html.push_str("<h2>Weitere Gäste</h2><ul>");
        for g in &guest.additional_guests {
            html.push_str(&format!("<li>{}</li>", escape_html(&guest_line(g))));
        }
        html.push_str("</ul>");
    }

    if !data.services.is_empty() {
        html.push_str("<h2>Zusatzleistungen</h2><table>");
        for (name, price, vat) in &data.services {
            html.push_str(&row(name, &format!("{} (inkl. {vat}% MwSt)", euro(*price))));
        }
        html.push_str("</table>");
    }

    html.push_str("<h2>Preis</h2><table>");
    html.push_str(&row("Gesamtpreis", &euro(data.total)));
    html.push_str(&row("Anzahlung", &euro(data.deposit)));
    html.push_str("</table>");

    if let Some(comments) = guest.comments.as_deref().filter(|c| !c.trim().is_empty()) {
        html.push_str(&format!(
            "<h2>Ihre Anmerkungen</h2><p>{}</p>",
            escape_html(comments)
        ));
    }

    html.push_str(&format!(
        "<hr><p>{}<br>{}<br>Tel. {}<br>{}</p></body></html>",
        escape_html(&data.hotel.name),
        escape_html(&data.hotel.address),
        escape_html(&data.hotel.phone),
        escape_html(&data.hotel.email)
    ));

    html
}

/// Render the confirmation for a completed booking.
///
/// # Errors
///
/// Returns `BookingError::InvalidCart` without guest or stay data.
pub fn confirmation_email(
    cart: &Cart,
    result: &BookingResult,
    hotel: &HotelInfo,
) -> Result<EmailMessage, BookingError> {
    let data = ConfirmationData::new(cart, result, hotel)?;

    Ok(EmailMessage {
        to: data.guest.email.clone(),
        subject: subject(&data),
        html: render_html(&data),
        text: render_text(&data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cart() -> Cart {
        serde_json::from_value(json!({
            "personalData": {
                "firstName": "Anna",
                "lastName": "<Berg>",
                "email": "anna@example.com",
                "street": "Marktplatz 1",
                "zipCode": "88316",
                "city": "Isny",
                "additionalGuests": [{"firstName": "Mia", "lastName": "Berg", "isChild": true, "age": 6}]
            },
            "searchData": {"startDate": "2025-07-01", "endDate": "2025-07-04", "adults": 2, "childrenAges": [6]},
            "calculatedAmounts": {"total": {"gross": 387.0}, "deposit": {"gross": 129.0}},
            "ratePlan": {"longRatePlan": "STERN-DBL-FLEX"},
            "offer": {
                "Title": "Allgäu Auszeit",
                "Services": [{"Name": "Frühstück", "Apaleo_Code": "BRKF", "Standardpreis": 18.5, "Steuer": 7, "selected": true}]
            }
        }))
        .unwrap()
    }

    fn result() -> BookingResult {
        BookingResult {
            booking_id: "BOOK-1".into(),
            reservation_number: "BOOK-1-1".into(),
            raw: serde_json::Value::Null,
        }
    }

    #[test]
    fn german_dates() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        assert_eq!(german_long_date(date), "Dienstag, 1. Juli 2025");
        let date = NaiveDate::from_ymd_opt(2025, 3, 16).unwrap();
        assert_eq!(german_long_date(date), "Sonntag, 16. März 2025");
    }

    #[test]
    fn euro_uses_decimal_comma() {
        assert_eq!(euro(129.0), "129,00 €");
        assert_eq!(euro(18.5), "18,50 €");
    }

    #[test]
    fn subject_names_reservation_and_hotel() {
        let email = confirmation_email(&cart(), &result(), &HotelInfo::default()).unwrap();
        assert_eq!(email.subject, "Booking Confirmation #BOOK-1-1 - Hotel Stern");
        assert_eq!(email.to, "anna@example.com");
    }

    #[test]
    fn text_body_contains_booking_details() {
        let email = confirmation_email(&cart(), &result(), &HotelInfo::default()).unwrap();
        assert!(email.text.contains("Buchungsnummer: BOOK-1"));
        assert!(email.text.contains("Anreise: Dienstag, 1. Juli 2025"));
        assert!(email.text.contains("Kinder: 1 (Alter: 6)"));
        assert!(email.text.contains("Mia Berg (Kind, 6 Jahre)"));
        assert!(email.text.contains("Frühstück: 18,50 €"));
        assert!(email.text.contains("Anzahlung: 129,00 €"));
        assert!(email.text.contains("Marktplatz 2, 88316 Isny im Allgäu"));
    }

    #[test]
    fn html_body_is_escaped() {
        let email = confirmation_email(&cart(), &result(), &HotelInfo::default()).unwrap();
        assert!(email.html.contains("Anna &lt;Berg&gt;"));
        assert!(!email.html.contains("<Berg>"));
        assert!(email.html.contains("Allgäu Auszeit"));
    }
}
