//! Outbound message model and its form-field serialization.

use crate::encoder::ImageEncoder;
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Timestamp layout Mailgun expects for `o:deliverytime`.
const RFC2822_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Per-message click tracking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTracking {
    /// Track clicks in the HTML part only.
    HtmlOnly,
    /// Track clicks in every part.
    All,
}

impl ClickTracking {
    fn as_param(self) -> &'static str {
        match self {
            ClickTracking::HtmlOnly => "htmlonly",
            ClickTracking::All => "yes",
        }
    }
}

/// A file carried by a message, keyed by its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name reported to the recipient.
    pub name: String,
    /// MIME type of `data`.
    pub mime_type: String,
    /// Raw file contents.
    pub data: Vec<u8>,
}

/// One multipart file part ready to be appended to the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPart<'a> {
    /// Positional form field name, `attachment[<index>]`.
    pub field_name: String,
    /// Whether the part comes from the inline collection.
    pub inline: bool,
    /// Name, MIME type and bytes of the file.
    pub attachment: &'a Attachment,
}

/// Ordered form fields produced by [`Message::to_parameters`].
///
/// Keys set with [`Parameters::set`] are unique (last write wins, first
/// position kept); [`Parameters::append`] allows repeated keys such as `o:tag`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    fields: Vec<(String, String)>,
}

impl Parameters {
    /// Store `value` under `key`, replacing an earlier value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(field) => field.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Add another value under `key`, keeping earlier ones.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value stored under `key`, in insertion order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether any value is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    /// Number of fields, counting repeated keys once per value.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field has been stored.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in the order they go on the wire.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl IntoIterator for Parameters {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// A single outbound email.
///
/// Build one with [`Message::new`], adjust the public options, then hand it to
/// [`Client::send`](crate::Client::send). The client serializes the message
/// before returning its future and keeps no reference to it.
///
/// # Examples
/// ```
/// use mailgun_client::Message;
///
/// let mut message = Message::new(
///     "Excited User <someone@sample.org>",
///     "a@x.com,b@y.com",
///     "Hello",
///     "Plain text body",
/// );
/// message.cc.push("c@z.com".to_string());
/// message.add_attachment(b"hi".to_vec(), "hello.txt", "text/plain");
///
/// let params = message.to_parameters();
/// assert_eq!(params.get("to"), Some("a@x.com,b@y.com"));
/// assert_eq!(params.get("cc"), Some("c@z.com"));
/// ```
#[derive(Debug, Clone)]
pub struct Message {
    from: String,
    /// Recipients, e.g. `Bob <bob@host.com>`.
    pub to: Vec<String>,
    /// Carbon-copy recipients; omitted from the request when empty.
    pub cc: Vec<String>,
    /// Blind carbon-copy recipients; omitted from the request when empty.
    pub bcc: Vec<String>,
    /// Message subject.
    pub subject: String,
    /// Plain-text body.
    pub text: String,
    /// HTML body.
    pub html: Option<String>,
    /// Campaign id for campaign analytics.
    pub campaign: Option<String>,
    /// Tags, sent as repeated `o:tag` fields.
    pub tags: Vec<String>,
    /// Custom MIME headers, sent as `h:X-<name>`.
    pub headers: BTreeMap<String, String>,
    /// Custom data attached to the message, sent as `v:<name>`.
    pub variables: BTreeMap<String, String>,
    /// Enables DKIM signatures for this message.
    pub dkim: bool,
    /// Enables Mailgun test mode.
    pub testing: bool,
    /// Toggles tracking for this message.
    pub tracking: bool,
    /// Toggles open tracking; overrides the domain-level setting.
    pub track_opens: bool,
    /// Overrides domain-level click tracking when set.
    pub track_clicks: Option<ClickTracking>,
    /// Schedules delivery instead of sending immediately.
    pub deliver_at: Option<DateTime<Utc>>,
    attachments: Vec<Attachment>,
    inline_attachments: Vec<Attachment>,
}

impl Message {
    /// Create a message. `to` is split on commas; splitting never yields an
    /// empty recipient list.
    pub fn new(
        from: impl Into<String>,
        to: &str,
        subject: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.split(',').map(str::to_string).collect(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: subject.into(),
            text: text.into(),
            html: None,
            campaign: None,
            tags: Vec::new(),
            headers: BTreeMap::new(),
            variables: BTreeMap::new(),
            dkim: false,
            testing: false,
            tracking: false,
            track_opens: false,
            track_clicks: None,
            deliver_at: None,
            attachments: Vec::new(),
            inline_attachments: Vec::new(),
        }
    }

    /// Sender address for the `From` header.
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Regular attachments in insertion order.
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Inline attachments in insertion order.
    pub fn inline_attachments(&self) -> &[Attachment] {
        &self.inline_attachments
    }

    /// Attach raw bytes. An attachment with the same name is replaced.
    pub fn add_attachment(
        &mut self,
        data: impl Into<Vec<u8>>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
    ) {
        upsert(
            &mut self.attachments,
            Attachment {
                name: name.into(),
                mime_type: mime_type.into(),
                data: data.into(),
            },
        );
    }

    /// Attach raw bytes to be referenced from the HTML body.
    pub fn add_inline_attachment(
        &mut self,
        data: impl Into<Vec<u8>>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
    ) {
        upsert(
            &mut self.inline_attachments,
            Attachment {
                name: name.into(),
                mime_type: mime_type.into(),
                data: data.into(),
            },
        );
    }

    /// Encode `image` with `encoder` and attach it.
    ///
    /// The encoder's file extension is appended to `name` unless already
    /// present. Returns [`Error::Unsupported`](crate::Error::Unsupported) or
    /// [`Error::Image`](crate::Error::Image) when encoding fails; the message is
    /// left unchanged in that case.
    pub fn add_image<E>(
        &mut self,
        image: &image::DynamicImage,
        name: &str,
        encoder: &E,
        inline: bool,
    ) -> Result<()>
    where
        E: ImageEncoder + ?Sized,
    {
        let data = encoder.encode(image)?;
        let suffix = format!(".{}", encoder.file_extension());
        let name = if name.ends_with(&suffix) {
            name.to_string()
        } else {
            format!("{name}{suffix}")
        };

        if inline {
            self.add_inline_attachment(data, name, encoder.mime_type());
        } else {
            self.add_attachment(data, name, encoder.mime_type());
        }
        Ok(())
    }

    /// Serialize the message into form fields.
    ///
    /// Empty `cc`/`bcc` and unset `html`/`campaign`/`deliver_at` are omitted.
    /// The five `o:` flags are always present. Headers and variables are
    /// written last, so a header that maps onto an earlier key overwrites it.
    pub fn to_parameters(&self) -> Parameters {
        let mut params = Parameters::default();
        params.set("to", self.to.join(","));
        params.set("from", self.from.as_str());
        params.set("subject", self.subject.as_str());
        params.set("text", self.text.as_str());

        if !self.cc.is_empty() {
            params.set("cc", self.cc.join(","));
        }
        if !self.bcc.is_empty() {
            params.set("bcc", self.bcc.join(","));
        }
        if let Some(html) = &self.html {
            params.set("html", html.as_str());
        }
        if let Some(campaign) = &self.campaign {
            params.set("o:campaign", campaign.as_str());
        }
        if let Some(deliver_at) = &self.deliver_at {
            params.set(
                "o:deliverytime",
                deliver_at.format(RFC2822_FORMAT).to_string(),
            );
        }
        for tag in &self.tags {
            params.append("o:tag", tag.as_str());
        }

        params.set("o:dkim", yes_no(self.dkim));
        params.set("o:testmode", yes_no(self.testing));
        params.set("o:tracking", yes_no(self.tracking));
        params.set(
            "o:tracking-clicks",
            self.track_clicks.map_or("no", ClickTracking::as_param),
        );
        params.set("o:tracking-opens", yes_no(self.track_opens));

        for (name, value) in &self.headers {
            params.set(format!("h:X-{name}"), value.as_str());
        }
        for (name, value) in &self.variables {
            params.set(format!("v:{name}"), value.as_str());
        }

        params
    }

    /// File parts for the request body: regular attachments first, then inline
    /// ones. Field indexes restart at zero for the inline group.
    pub fn attachment_parts(&self) -> Vec<AttachmentPart<'_>> {
        let regular = self.attachments.iter().enumerate().map(|(i, a)| (i, a, false));
        let inline = self
            .inline_attachments
            .iter()
            .enumerate()
            .map(|(i, a)| (i, a, true));

        regular
            .chain(inline)
            .map(|(index, attachment, inline)| AttachmentPart {
                field_name: format!("attachment[{index}]"),
                inline,
                attachment,
            })
            .collect()
    }
}

fn upsert(collection: &mut Vec<Attachment>, attachment: Attachment) {
    match collection.iter_mut().find(|a| a.name == attachment.name) {
        Some(existing) => *existing = attachment,
        None => collection.push(attachment),
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Message {
        Message::new(
            "Excited User <a@sample.org>",
            "Jay <jay@x.com>",
            "Hi",
            "Hello ☃",
        )
    }

    #[test]
    fn optional_fields_are_omitted_when_unset() {
        let params = sample().to_parameters();
        for key in ["cc", "bcc", "html", "o:campaign", "o:deliverytime", "o:tag"] {
            assert!(!params.contains_key(key), "{key} should be omitted");
        }
        assert_eq!(params.get("to"), Some("Jay <jay@x.com>"));
        assert_eq!(params.get("from"), Some("Excited User <a@sample.org>"));
        assert_eq!(params.get("subject"), Some("Hi"));
        assert_eq!(params.get("text"), Some("Hello ☃"));
    }

    #[test]
    fn default_flags_serialize_to_no() {
        let params = sample().to_parameters();
        for key in [
            "o:dkim",
            "o:testmode",
            "o:tracking",
            "o:tracking-clicks",
            "o:tracking-opens",
        ] {
            assert_eq!(params.get(key), Some("no"), "{key}");
        }
        assert_eq!(params.len(), 9);
    }

    #[test]
    fn flags_and_click_tracking_modes() {
        let mut message = sample();
        message.dkim = true;
        message.track_opens = true;
        message.track_clicks = Some(ClickTracking::HtmlOnly);
        let params = message.to_parameters();
        assert_eq!(params.get("o:dkim"), Some("yes"));
        assert_eq!(params.get("o:testmode"), Some("no"));
        assert_eq!(params.get("o:tracking-opens"), Some("yes"));
        assert_eq!(params.get("o:tracking-clicks"), Some("htmlonly"));

        message.track_clicks = Some(ClickTracking::All);
        assert_eq!(message.to_parameters().get("o:tracking-clicks"), Some("yes"));
    }

    #[test]
    fn optional_fields_are_included_when_set() {
        let mut message = sample();
        message.cc = vec!["b@x.com".into(), "a@x.com".into()];
        message.bcc = vec!["hidden@x.com".into()];
        message.html = Some("<p>Hello</p>".into());
        message.campaign = Some("spring".into());
        message.tags = vec!["welcome".into(), "onboarding".into()];

        let params = message.to_parameters();
        assert_eq!(params.get("cc"), Some("b@x.com,a@x.com"));
        assert_eq!(params.get("bcc"), Some("hidden@x.com"));
        assert_eq!(params.get("html"), Some("<p>Hello</p>"));
        assert_eq!(params.get("o:campaign"), Some("spring"));
        assert_eq!(
            params.get_all("o:tag").collect::<Vec<_>>(),
            vec!["welcome", "onboarding"]
        );
    }

    #[test]
    fn delivery_time_uses_rfc2822() {
        let mut message = sample();
        message.deliver_at = Some(Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap());
        assert_eq!(
            message.to_parameters().get("o:deliverytime"),
            Some("Mon, 02 Jan 2006 15:04:05 +0000")
        );
    }

    #[test]
    fn headers_and_variables_are_prefixed() {
        let mut message = sample();
        message.headers.insert("Reply-To".into(), "a@b.com".into());
        message.variables.insert("customerId".into(), "42".into());

        let params = message.to_parameters();
        assert_eq!(params.get("h:X-Reply-To"), Some("a@b.com"));
        assert_eq!(params.get("v:customerId"), Some("42"));
    }

    #[test]
    fn recipients_round_trip_through_comma_split() {
        let message = Message::new("me@x.com", "a@x.com,b@y.com", "s", "t");
        assert_eq!(message.to, vec!["a@x.com", "b@y.com"]);
        assert_eq!(message.to_parameters().get("to"), Some("a@x.com,b@y.com"));

        let empty = Message::new("me@x.com", "", "s", "t");
        assert_eq!(empty.to, vec![""]);
    }

    #[test]
    fn same_name_attachment_overwrites() {
        let mut message = sample();
        message.add_attachment(b"first".to_vec(), "foo.txt", "text/plain");
        message.add_attachment(b"other".to_vec(), "bar.txt", "text/plain");
        message.add_attachment(b"second".to_vec(), "foo.txt", "text/markdown");

        let parts = message.attachment_parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].attachment.name, "foo.txt");
        assert_eq!(parts[0].attachment.data, b"second");
        assert_eq!(parts[0].attachment.mime_type, "text/markdown");
    }

    #[test]
    fn single_attachment_part() {
        let mut message = sample();
        message.add_attachment(b"hello".to_vec(), "foo.txt", "text/plain");

        let parts = message.attachment_parts();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].field_name, "attachment[0]");
        assert_eq!(parts[0].attachment.name, "foo.txt");
        assert_eq!(parts[0].attachment.mime_type, "text/plain");
        assert_eq!(parts[0].attachment.data, b"hello");
        assert!(!parts[0].inline);
    }

    #[test]
    fn inline_parts_follow_regular_ones_with_restarted_index() {
        let mut message = sample();
        message.add_attachment(b"a".to_vec(), "a.txt", "text/plain");
        message.add_attachment(b"b".to_vec(), "b.txt", "text/plain");
        message.add_inline_attachment(b"c".to_vec(), "logo.png", "image/png");

        let names: Vec<_> = message
            .attachment_parts()
            .into_iter()
            .map(|p| (p.field_name, p.inline))
            .collect();
        assert_eq!(
            names,
            vec![
                ("attachment[0]".to_string(), false),
                ("attachment[1]".to_string(), false),
                ("attachment[0]".to_string(), true),
            ]
        );
    }

    #[test]
    fn set_replaces_in_place() {
        let mut params = sample().to_parameters();
        let position = params.iter().position(|(k, _)| k == "o:dkim");
        params.set("o:dkim", "yes");
        assert_eq!(params.get("o:dkim"), Some("yes"));
        assert_eq!(params.get_all("o:dkim").count(), 1);
        assert_eq!(params.iter().position(|(k, _)| k == "o:dkim"), position);
    }

    #[test]
    fn later_header_wins_on_shared_key() {
        let mut message = sample();
        message.headers.insert("Reply-To".into(), "first@b.com".into());
        message.variables.insert("order".into(), "1".into());
        let mut params = message.to_parameters();

        // A second writer to the same `h:X-` key replaces the first.
        params.set("h:X-Reply-To", "second@b.com");

        assert_eq!(params.get("h:X-Reply-To"), Some("second@b.com"));
        assert_eq!(params.get_all("h:X-Reply-To").count(), 1);
        assert_eq!(params.get("v:order"), Some("1"));
    }

    #[test]
    fn header_named_like_a_reserved_key_is_kept_apart() {
        let mut message = sample();
        message.dkim = true;
        message.headers.insert("o:dkim".into(), "no".into());

        let params = message.to_parameters();
        assert_eq!(params.get("o:dkim"), Some("yes"));
        assert_eq!(params.get("h:X-o:dkim"), Some("no"));
    }

    #[test]
    fn tags_stay_repeated_after_set() {
        let mut message = sample();
        message.tags = vec!["a".into(), "b".into()];
        let mut params = message.to_parameters();

        params.set("o:testmode", "yes");
        params.set("subject", "Changed");

        assert_eq!(params.get_all("o:tag").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(params.get("o:testmode"), Some("yes"));
        assert_eq!(params.get("subject"), Some("Changed"));
    }
}
