//! Client-side checks for the travel-document form.
//!
//! Nothing here touches the network: a form that fails these checks never produces a
//! request.

use crate::expiry::{format_wire_date, parse_wire_date};
use crate::model::{
    Attachment, DocumentFields, DocumentKind, TravelDocumentRecord, TravelDocumentSubmission,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncReadExt;

/// Largest accepted scan, 5 MiB.
pub const MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("File is too large. Maximum size is 5MB. ({} is {size} bytes)", .path.display())]
    FileTooLarge { path: PathBuf, size: u64 },
    #[error("Please select an image or PDF file. ({} looks like {mime})", .path.display())]
    UnsupportedType { path: PathBuf, mime: String },
    #[error("could not read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{field} must be a date in YYYY-MM-DD form, got {value:?}")]
    InvalidDate { field: &'static str, value: String },
    #[error("a {0} image or scan is required")]
    MissingAttachment(DocumentKind),
}

pub fn is_accepted_mime(mime: &str) -> bool {
    let mime = mime.trim().to_ascii_lowercase();
    mime.starts_with("image/") || mime == "application/pdf"
}

/// Size and type gate applied before any attachment bytes are read.
pub fn check_attachment(path: &Path, size: u64, mime: &str) -> Result<(), ValidationError> {
    if size > MAX_ATTACHMENT_BYTES {
        return Err(ValidationError::FileTooLarge {
            path: path.to_path_buf(),
            size,
        });
    }
    if !is_accepted_mime(mime) {
        return Err(ValidationError::UnsupportedType {
            path: path.to_path_buf(),
            mime: mime.to_string(),
        });
    }
    Ok(())
}

impl Attachment {
    /// Load a scan from disk after checking its size and guessed MIME type.
    pub async fn load(kind: DocumentKind, path: &Path) -> Result<Self, ValidationError> {
        let unreadable = |source| ValidationError::Unreadable {
            path: path.to_path_buf(),
            source,
        };
        let meta = tokio::fs::metadata(path).await.map_err(unreadable)?;
        let mime = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream");
        check_attachment(path, meta.len(), mime)?;

        // Read one byte past the limit so a file that grew since the metadata call is caught.
        let file = tokio::fs::File::open(path).await.map_err(unreadable)?;
        let mut bytes = Vec::with_capacity(meta.len() as usize);
        file.take(MAX_ATTACHMENT_BYTES + 1)
            .read_to_end(&mut bytes)
            .await
            .map_err(unreadable)?;
        Self::from_contents(kind, path, mime, bytes)
    }

    fn from_contents(
        kind: DocumentKind,
        path: &Path,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<Self, ValidationError> {
        check_attachment(path, bytes.len() as u64, mime)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{kind}.bin"));
        Ok(Attachment {
            kind,
            file_name,
            mime: mime.to_string(),
            bytes: Bytes::from(bytes),
        })
    }
}

/// Editable form contents; empty strings mean "not filled in".
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    pub full_name_as_per_documents: String,
    pub date_of_birth: String,
    pub passport_number: String,
    pub passport_expiry_date: String,
    pub visa_number: String,
    pub visa_expiry_date: String,
    pub passport_image: Option<Attachment>,
    pub visa_image: Option<Attachment>,
}

fn fill(slot: &mut String, value: &str) {
    if slot.trim().is_empty() {
        *slot = value.to_string();
    }
}

fn fill_date(slot: &mut String, value: Option<&str>) {
    if let Some(date) = value.and_then(parse_wire_date) {
        fill(slot, &format_wire_date(date));
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(value.to_string())
}

fn required_date(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = required(field, value)?;
    let date = parse_wire_date(&value).ok_or(ValidationError::InvalidDate {
        field,
        value: value.clone(),
    })?;
    Ok(format_wire_date(date))
}

impl SubmissionForm {
    /// Fill blank fields from a previously saved draft.
    pub fn prefill_from(&mut self, draft: &TravelDocumentRecord) {
        fill(
            &mut self.full_name_as_per_documents,
            &draft.full_name_as_per_documents,
        );
        fill_date(&mut self.date_of_birth, draft.date_of_birth.as_deref());
        fill(&mut self.passport_number, &draft.passport_number);
        fill_date(
            &mut self.passport_expiry_date,
            draft.passport_expiry_date.as_deref(),
        );
        fill(&mut self.visa_number, &draft.visa_number);
        fill_date(&mut self.visa_expiry_date, draft.visa_expiry_date.as_deref());
    }

    /// Check every required field. An image may be omitted only when `existing`
    /// already carries one for that document.
    pub fn validate(
        self,
        existing: Option<&TravelDocumentRecord>,
    ) -> Result<TravelDocumentSubmission, ValidationError> {
        let fields = DocumentFields {
            full_name_as_per_documents: required(
                "full name (as per documents)",
                &self.full_name_as_per_documents,
            )?,
            date_of_birth: required_date("date of birth", &self.date_of_birth)?,
            passport_number: required("passport number", &self.passport_number)?,
            passport_expiry_date: required_date(
                "passport expiry date",
                &self.passport_expiry_date,
            )?,
            visa_number: required("visa number", &self.visa_number)?,
            visa_expiry_date: required_date("visa expiry date", &self.visa_expiry_date)?,
        };

        for (kind, attached) in [
            (DocumentKind::Passport, self.passport_image.is_some()),
            (DocumentKind::Visa, self.visa_image.is_some()),
        ] {
            let on_file = existing.and_then(|r| r.image_url(kind)).is_some();
            if !attached && !on_file {
                return Err(ValidationError::MissingAttachment(kind));
            }
        }

        Ok(TravelDocumentSubmission {
            fields,
            passport_image: self.passport_image,
            visa_image: self.visa_image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn attachment(kind: DocumentKind) -> Attachment {
        Attachment {
            kind,
            file_name: format!("{kind}.png"),
            mime: "image/png".into(),
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    fn complete_form() -> SubmissionForm {
        SubmissionForm {
            full_name_as_per_documents: "Ada Lovelace".into(),
            date_of_birth: "1990-12-10".into(),
            passport_number: "P1234567".into(),
            passport_expiry_date: "2031-05-01".into(),
            visa_number: "V-77".into(),
            visa_expiry_date: "2027-02-28".into(),
            passport_image: Some(attachment(DocumentKind::Passport)),
            visa_image: Some(attachment(DocumentKind::Visa)),
        }
    }

    #[test]
    fn accepts_images_and_pdf_only() {
        assert!(is_accepted_mime("image/jpeg"));
        assert!(is_accepted_mime("image/png"));
        assert!(is_accepted_mime("application/pdf"));
        assert!(!is_accepted_mime("application/zip"));
        assert!(!is_accepted_mime("text/plain"));
        assert!(!is_accepted_mime("application/octet-stream"));
    }

    #[test]
    fn size_limit_is_inclusive() {
        let p = Path::new("scan.pdf");
        assert!(check_attachment(p, MAX_ATTACHMENT_BYTES, "application/pdf").is_ok());
        let err = check_attachment(p, MAX_ATTACHMENT_BYTES + 1, "application/pdf").unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
        assert!(err.to_string().starts_with("File is too large. Maximum size is 5MB."));
    }

    #[tokio::test]
    async fn load_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passport.jpg");
        let f = std::fs::File::create(&path).unwrap();
        f.set_len(MAX_ATTACHMENT_BYTES + 1).unwrap();

        let err = Attachment::load(DocumentKind::Passport, &path)
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
    }

    #[test]
    fn contents_larger_than_reported_size_are_rejected() {
        let path = Path::new("passport.jpg");
        let grown = vec![0u8; MAX_ATTACHMENT_BYTES as usize + 1];
        let err = Attachment::from_contents(DocumentKind::Passport, path, "image/jpeg", grown)
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::FileTooLarge { size, .. } if size == MAX_ATTACHMENT_BYTES + 1
        ));

        let exact = vec![0u8; MAX_ATTACHMENT_BYTES as usize];
        let ok = Attachment::from_contents(DocumentKind::Passport, path, "image/jpeg", exact);
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn load_rejects_unsupported_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visa.docx");
        std::fs::write(&path, b"doc").unwrap();

        let err = Attachment::load(DocumentKind::Visa, &path)
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedType { .. }));
        assert!(err.to_string().starts_with("Please select an image or PDF file."));
    }

    #[tokio::test]
    async fn load_reads_pdf_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visa.pdf");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"%PDF-1.7").unwrap();

        let a = Attachment::load(DocumentKind::Visa, &path).await.unwrap();
        assert_eq!(a.mime, "application/pdf");
        assert_eq!(a.file_name, "visa.pdf");
        assert_eq!(&a.bytes[..], b"%PDF-1.7");
    }

    #[test]
    fn validate_requires_every_text_field() {
        let mut form = complete_form();
        form.visa_number = "   ".into();
        let err = form.validate(None).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField("visa number")));
    }

    #[test]
    fn validate_rejects_bad_dates() {
        let mut form = complete_form();
        form.passport_expiry_date = "01/05/2031".into();
        assert!(matches!(
            form.validate(None),
            Err(ValidationError::InvalidDate {
                field: "passport expiry date",
                ..
            })
        ));
    }

    #[test]
    fn image_may_be_omitted_when_already_on_file() {
        let mut form = complete_form();
        form.passport_image = None;
        assert!(matches!(
            form.clone().validate(None),
            Err(ValidationError::MissingAttachment(DocumentKind::Passport))
        ));

        let draft = TravelDocumentRecord {
            passport_image_url: Some("/uploads/p.jpg".into()),
            ..Default::default()
        };
        let submission = form.validate(Some(&draft)).unwrap();
        assert!(submission.passport_image.is_none());
        assert_eq!(submission.attachments().count(), 1);
    }

    #[test]
    fn prefill_keeps_user_input_and_trims_timestamps() {
        let draft = TravelDocumentRecord {
            full_name_as_per_documents: "Draft Name".into(),
            passport_number: "P-OLD".into(),
            passport_expiry_date: Some("2031-05-01T00:00:00.000Z".into()),
            ..Default::default()
        };
        let mut form = SubmissionForm {
            passport_number: "P-NEW".into(),
            ..Default::default()
        };
        form.prefill_from(&draft);
        assert_eq!(form.full_name_as_per_documents, "Draft Name");
        assert_eq!(form.passport_number, "P-NEW");
        assert_eq!(form.passport_expiry_date, "2031-05-01");
        assert!(form.visa_expiry_date.is_empty());
    }
}
