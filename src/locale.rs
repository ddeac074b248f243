//! User-facing error text.
//!
//! [`Error`]'s `Display` is for logs. Applications that show failures to people
//! go through [`describe`], which picks wording by [`Locale`] and keeps the
//! device's own NACK message verbatim.

use std::fmt;

use crate::protocol::{Error, ErrorKind};

/// Supported UI languages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Locale {
    /// English
    #[default]
    En,
    /// German
    De,
}

impl Locale {
    /// Match a BCP 47 tag such as `de-AT`; unknown languages fall back to English.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        let lang = tag.split(['-', '_']).next().unwrap_or_default();
        if lang.eq_ignore_ascii_case("de") {
            Self::De
        } else {
            Self::En
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::En => "en",
            Self::De => "de",
        })
    }
}

fn template(kind: ErrorKind, locale: Locale) -> &'static str {
    use ErrorKind as K;

    match locale {
        Locale::En => match kind {
            K::NoDeviceSpecified => "No device was specified.",
            K::NoConnectedDevice => "No device is connected.",
            K::DeviceNotOpened => "The device is not open.",
            K::EmptyCommand => "There is no data to send.",
            K::MessageTooLong => "The command is too long to send.",
            K::TransportOpenFailed => "Could not open the device",
            K::TransportCloseFailed => "Could not close the device",
            K::TransportWriteFailed => "Sending to the device failed",
            K::TransportReadFailed => "Reading from the device failed",
            K::TransportClosed => "The connection was closed.",
            K::ReadTimeout => "The device did not answer in time.",
            K::EmptyResponse => "The device returned an empty response.",
            K::DeviceReportedError => "The device reported an error",
            K::UnknownMessageType => "Unknown message type",
            K::ResponseTooLong => "The device response is too long.",
            K::MalformedResponse => "The device sent an unreadable response.",
        },
        Locale::De => match kind {
            K::NoDeviceSpecified => "Es wurde kein Gerät angegeben.",
            K::NoConnectedDevice => "Kein Gerät verbunden.",
            K::DeviceNotOpened => "Das Gerät ist nicht geöffnet.",
            K::EmptyCommand => "Keine Daten zum Senden.",
            K::MessageTooLong => "Der Befehl ist zu lang.",
            K::TransportOpenFailed => "Gerät konnte nicht geöffnet werden",
            K::TransportCloseFailed => "Gerät konnte nicht geschlossen werden",
            K::TransportWriteFailed => "Senden an das Gerät fehlgeschlagen",
            K::TransportReadFailed => "Lesen vom Gerät fehlgeschlagen",
            K::TransportClosed => "Die Verbindung wurde geschlossen.",
            K::ReadTimeout => "Das Gerät hat nicht rechtzeitig geantwortet.",
            K::EmptyResponse => "Das Gerät hat eine leere Antwort geliefert.",
            K::DeviceReportedError => "Das Gerät meldet einen Fehler",
            K::UnknownMessageType => "Unbekannter Nachrichtentyp",
            K::ResponseTooLong => "Die Antwort des Geräts ist zu lang.",
            K::MalformedResponse => "Das Gerät hat eine unlesbare Antwort gesendet.",
        },
    }
}

/// Format `err` for display in `locale`.
///
/// Transport failures append the underlying cause; device errors append the
/// device's text; unknown message types append the offending byte.
#[must_use]
pub fn describe(err: &Error, locale: Locale) -> String {
    let text = template(err.kind(), locale);

    match err {
        Error::TransportOpenFailed(cause)
        | Error::TransportCloseFailed(cause)
        | Error::TransportWriteFailed(cause)
        | Error::TransportReadFailed(cause) => format!("{text}: {cause}"),
        Error::DeviceReportedError(message) => format!("{text}: {message}"),
        Error::UnknownMessageType { type_byte } => format!("{text}: {type_byte}"),
        _ => text.to_owned(),
    }
}
