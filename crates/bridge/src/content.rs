//! Inbound content model and classification.
//!
//! The network delivers heterogeneous payloads; everything the bridge
//! accepts is an explicit tagged union, and both the classifier and the
//! text extractor match it exhaustively.

use std::sync::LazyLock;

use {
    deskbridge_messaging::PeerId,
    regex::Regex,
    serde::{Deserialize, Serialize},
};

/// One message received from the network session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Network message id; also the dedup source-tag seed.
    pub id: String,
    /// Whether the session's own account authored the message.
    #[serde(default)]
    pub from_self: bool,
    pub peer_id: PeerId,
    #[serde(default)]
    pub sender_name: Option<String>,
    /// Network-supplied unix timestamp in seconds.
    pub timestamp: i64,
    pub content: InboundContent,
}

impl InboundMessage {
    /// Digits-only phone derived from the peer id (multi-device suffix
    /// stripped).
    pub fn phone(&self) -> &str {
        self.peer_id.user()
    }

    /// Display name, falling back to the phone.
    pub fn display_name(&self) -> &str {
        match self.sender_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.phone(),
        }
    }
}

/// Tagged union over everything the network can deliver. Inline binary
/// payloads arrive base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundContent {
    Text {
        body: String,
    },
    Image {
        #[serde(default)]
        mimetype: String,
        #[serde(default)]
        caption: String,
        #[serde(default)]
        data: Option<String>,
    },
    Video {
        #[serde(default)]
        mimetype: String,
        #[serde(default)]
        caption: String,
        #[serde(default)]
        data: Option<String>,
    },
    Audio {
        #[serde(default)]
        mimetype: String,
        #[serde(default)]
        data: Option<String>,
    },
    Document {
        #[serde(default)]
        mimetype: String,
        #[serde(default)]
        filename: Option<String>,
        #[serde(default)]
        caption: String,
        #[serde(default)]
        data: Option<String>,
    },
    ContactCard {
        #[serde(default)]
        display_name: String,
        #[serde(default)]
        vcard: String,
    },
    Reaction {
        #[serde(default)]
        glyph: String,
    },
    Unsupported,
}

impl InboundContent {
    /// Base64 payload, when the content carries one inline.
    pub fn inline_data(&self) -> Option<&str> {
        match self {
            Self::Image { data, .. }
            | Self::Video { data, .. }
            | Self::Audio { data, .. }
            | Self::Document { data, .. } => data.as_deref(),
            _ => None,
        }
    }
}

/// Upload-ready description of a media payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaProfile {
    pub filename: String,
    /// Never contains a `;` parameter suffix.
    pub mimetype: String,
    pub caption: String,
}

/// Classifier output: either a media profile or a plain text rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Media(MediaProfile),
    Text(String),
}

static WAID_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"waid=(\d+)").expect("static regex")
});

/// Strip mimetype parameters (`; codecs=...`) and surrounding whitespace.
fn clean_mimetype(raw: &str) -> &str {
    raw.split(';').next().unwrap_or_default().trim()
}

/// Fixed mimetype → file extension table. Unmapped types fall back to a
/// kind-specific default at the call sites.
fn extension_for(mimetype: &str) -> Option<&'static str> {
    Some(match mimetype {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "video/mp4" => "mp4",
        "video/3gpp" => "3gp",
        "video/quicktime" => "mov",
        "audio/ogg" => "ogg",
        "audio/mp4" => "m4a",
        "audio/mpeg" => "mp3",
        "application/pdf" => "pdf",
        "application/zip" => "zip",
        "text/plain" => "txt",
        _ => return None,
    })
}

/// Classify inbound content into an upload profile or a text rendering.
/// Pure and total over the union.
pub fn classify(msg: &InboundMessage) -> Classified {
    match &msg.content {
        InboundContent::Text { body } => Classified::Text(body.clone()),
        InboundContent::Audio { mimetype, .. } => {
            // Voice notes carry no caption. Anything that is not clearly
            // an mp4 container is treated as ogg.
            let (mime, ext) = if !mimetype.contains("ogg") && mimetype.contains("mp4") {
                ("audio/mp4", "m4a")
            } else {
                ("audio/ogg", "ogg")
            };
            Classified::Media(MediaProfile {
                filename: format!("{}.{ext}", msg.id),
                mimetype: mime.into(),
                caption: String::new(),
            })
        },
        InboundContent::Image { mimetype, caption, .. } => {
            let mut mime = clean_mimetype(mimetype);
            if mime.is_empty() {
                mime = "image/jpeg";
            }
            let ext = extension_for(mime).unwrap_or("jpg");
            Classified::Media(MediaProfile {
                filename: format!("{}.{ext}", msg.id),
                mimetype: mime.into(),
                caption: caption.clone(),
            })
        },
        InboundContent::Video { mimetype, caption, .. } => {
            let mut mime = clean_mimetype(mimetype);
            if mime.is_empty() {
                mime = "video/mp4";
            }
            let ext = extension_for(mime).unwrap_or("mp4");
            Classified::Media(MediaProfile {
                filename: format!("{}.{ext}", msg.id),
                mimetype: mime.into(),
                caption: caption.clone(),
            })
        },
        InboundContent::Document {
            mimetype,
            filename,
            caption,
            ..
        } => {
            let mut mime = clean_mimetype(mimetype);
            if mime.is_empty() {
                mime = "application/octet-stream";
            }
            let name = match filename.as_deref() {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => {
                    let ext = extension_for(mime).unwrap_or("bin");
                    format!("{}.{ext}", msg.id)
                },
            };
            Classified::Media(MediaProfile {
                filename: name,
                mimetype: mime.into(),
                caption: caption.clone(),
            })
        },
        InboundContent::ContactCard { display_name, vcard } => {
            let phone = WAID_RE
                .captures(vcard)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .unwrap_or_default();
            Classified::Text(format!("Name: {display_name}\nPhone: {phone}"))
        },
        InboundContent::Reaction { glyph } => Classified::Text(format!("[Reaction: {glyph}]")),
        InboundContent::Unsupported => Classified::Media(MediaProfile {
            filename: format!("{}.bin", msg.id),
            mimetype: "application/octet-stream".into(),
            caption: String::new(),
        }),
    }
}

/// Render inbound content as conversation text for pure-text delivery.
/// Total over the union; unsupported content yields an empty string.
pub fn extract_text(msg: &InboundMessage) -> String {
    match &msg.content {
        InboundContent::Text { body } => body.clone(),
        InboundContent::Image { caption, .. } if !caption.is_empty() => caption.clone(),
        InboundContent::Image { .. } => "[Image]".into(),
        InboundContent::Video { caption, .. } if !caption.is_empty() => caption.clone(),
        InboundContent::Video { .. } => "[Video]".into(),
        InboundContent::Audio { .. } => "[Audio]".into(),
        InboundContent::Document { caption, .. } if !caption.is_empty() => caption.clone(),
        InboundContent::Document {
            filename: Some(name),
            ..
        } if !name.is_empty() => format!("[Document: {name}]"),
        InboundContent::Document { .. } => "[Document]".into(),
        InboundContent::ContactCard { display_name, .. } => format!("[Contact: {display_name}]"),
        InboundContent::Reaction { glyph } => format!("[Reaction: {glyph}]"),
        InboundContent::Unsupported => String::new(),
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, content: InboundContent) -> InboundMessage {
        InboundMessage {
            id: id.into(),
            from_self: false,
            peer_id: PeerId::parse("5511999999999@s.whatsapp.net").unwrap(),
            sender_name: Some("Ana".into()),
            timestamp: 0,
            content,
        }
    }

    fn media(classified: Classified) -> MediaProfile {
        match classified {
            Classified::Media(profile) => profile,
            Classified::Text(text) => panic!("expected media, got text {text:?}"),
        }
    }

    #[test]
    fn opus_voice_note_is_ogg() {
        let msg = message(
            "ABC123",
            InboundContent::Audio {
                mimetype: "audio/ogg; codecs=opus".into(),
                data: None,
            },
        );
        let profile = media(classify(&msg));
        assert_eq!(profile.filename, "ABC123.ogg");
        assert_eq!(profile.mimetype, "audio/ogg");
        assert_eq!(profile.caption, "");
    }

    #[test]
    fn mp4_audio_maps_to_m4a() {
        let msg = message(
            "A1",
            InboundContent::Audio {
                mimetype: "audio/mp4".into(),
                data: None,
            },
        );
        let profile = media(classify(&msg));
        assert_eq!(profile.filename, "A1.m4a");
        assert_eq!(profile.mimetype, "audio/mp4");
    }

    #[test]
    fn unknown_audio_defaults_to_ogg() {
        let msg = message(
            "A2",
            InboundContent::Audio {
                mimetype: "audio/weird".into(),
                data: None,
            },
        );
        let profile = media(classify(&msg));
        assert_eq!(profile.mimetype, "audio/ogg");
        assert_eq!(profile.filename, "A2.ogg");
    }

    #[test]
    fn media_mimetypes_carry_no_parameters() {
        let contents = [
            InboundContent::Image {
                mimetype: "image/png; foo=bar".into(),
                caption: String::new(),
                data: None,
            },
            InboundContent::Video {
                mimetype: "video/mp4 ; codecs=avc1".into(),
                caption: String::new(),
                data: None,
            },
            InboundContent::Audio {
                mimetype: "audio/ogg; codecs=opus".into(),
                data: None,
            },
            InboundContent::Document {
                mimetype: "application/pdf;x=y".into(),
                filename: None,
                caption: String::new(),
                data: None,
            },
        ];
        for content in contents {
            let profile = media(classify(&message("M", content)));
            assert!(
                !profile.mimetype.contains(';'),
                "parameters leaked into {:?}",
                profile.mimetype
            );
        }
    }

    #[test]
    fn empty_image_mimetype_falls_back_to_jpeg() {
        let msg = message(
            "IMG",
            InboundContent::Image {
                mimetype: "  ".into(),
                caption: "sunset".into(),
                data: None,
            },
        );
        let profile = media(classify(&msg));
        assert_eq!(profile.mimetype, "image/jpeg");
        assert_eq!(profile.filename, "IMG.jpg");
        assert_eq!(profile.caption, "sunset");
    }

    #[test]
    fn unmapped_video_mimetype_keeps_kind_default_extension() {
        let msg = message(
            "VID",
            InboundContent::Video {
                mimetype: "video/x-matroska".into(),
                caption: String::new(),
                data: None,
            },
        );
        let profile = media(classify(&msg));
        assert_eq!(profile.mimetype, "video/x-matroska");
        assert_eq!(profile.filename, "VID.mp4");
    }

    #[test]
    fn document_prefers_provided_filename() {
        let msg = message(
            "DOC",
            InboundContent::Document {
                mimetype: "application/pdf".into(),
                filename: Some("invoice.pdf".into()),
                caption: "march".into(),
                data: None,
            },
        );
        let profile = media(classify(&msg));
        assert_eq!(profile.filename, "invoice.pdf");
        assert_eq!(profile.caption, "march");
    }

    #[test]
    fn document_without_name_or_mimetype_gets_defaults() {
        let msg = message(
            "DOC",
            InboundContent::Document {
                mimetype: String::new(),
                filename: None,
                caption: String::new(),
                data: None,
            },
        );
        let profile = media(classify(&msg));
        assert_eq!(profile.mimetype, "application/octet-stream");
        assert_eq!(profile.filename, "DOC.bin");
    }

    #[test]
    fn contact_card_extracts_waid_phone() {
        let msg = message(
            "C1",
            InboundContent::ContactCard {
                display_name: "Bruno".into(),
                vcard: "BEGIN:VCARD\nTEL;waid=5511888887777:+55 11 88888-7777\nEND:VCARD".into(),
            },
        );
        assert_eq!(
            classify(&msg),
            Classified::Text("Name: Bruno\nPhone: 5511888887777".into())
        );
    }

    #[test]
    fn contact_card_without_waid_keeps_empty_phone() {
        let msg = message(
            "C2",
            InboundContent::ContactCard {
                display_name: "Bruno".into(),
                vcard: "BEGIN:VCARD\nEND:VCARD".into(),
            },
        );
        assert_eq!(classify(&msg), Classified::Text("Name: Bruno\nPhone: ".into()));
    }

    #[test]
    fn unsupported_content_is_an_opaque_blob() {
        let profile = media(classify(&message("X9", InboundContent::Unsupported)));
        assert_eq!(profile.filename, "X9.bin");
        assert_eq!(profile.mimetype, "application/octet-stream");
    }

    #[test]
    fn text_extraction_placeholders() {
        let cases = [
            (InboundContent::Text { body: "oi".into() }, "oi"),
            (
                InboundContent::Image {
                    mimetype: String::new(),
                    caption: String::new(),
                    data: None,
                },
                "[Image]",
            ),
            (
                InboundContent::Image {
                    mimetype: String::new(),
                    caption: "look".into(),
                    data: None,
                },
                "look",
            ),
            (
                InboundContent::Audio {
                    mimetype: String::new(),
                    data: None,
                },
                "[Audio]",
            ),
            (
                InboundContent::Document {
                    mimetype: String::new(),
                    filename: Some("a.pdf".into()),
                    caption: String::new(),
                    data: None,
                },
                "[Document: a.pdf]",
            ),
            (
                InboundContent::Reaction { glyph: "👍".into() },
                "[Reaction: 👍]",
            ),
            (InboundContent::Unsupported, ""),
        ];
        for (content, expected) in cases {
            assert_eq!(extract_text(&message("T", content)), expected);
        }
    }

    #[test]
    fn display_name_falls_back_to_phone() {
        let mut msg = message("N", InboundContent::Unsupported);
        msg.sender_name = None;
        assert_eq!(msg.display_name(), "5511999999999");
    }
}
