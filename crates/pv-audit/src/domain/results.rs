//! The result ledger: typed, parameterized findings for one audit unit.
//!
//! Every audit invocation produces exactly one [`AuditResults`] ledger. A
//! finding is a `(code, rendered message)` pair; the codes form a closed set
//! and each code has exactly one `%{named}` placeholder template. Adding a
//! code means adding its template here, nowhere else.
//!
//! The ledger is ephemeral: it is handed to reporters and then discarded,
//! never persisted.

use pv_types::{ObjectId, VersionNumber};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

/// Closed set of finding codes.
///
/// The serialized name of each code (`as_str`) is the key reporters see in
/// the ledger JSON; it is part of the external contract and never changes
/// shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultCode {
    VersionMatches,
    ActualVersGreaterThanCatalog,
    UnexpectedVersion,
    CatalogVersionsDisagree,
    CreatedNewObject,
    ObjectAlreadyInCatalog,
    ObjectNotInCatalog,
    RecordStatusChanged,
    UnableToCheckStatus,
    MoabNotFound,
    InvalidMoab,
    InvalidArguments,
    DbUpdateFailed,
    ChecksumMismatch,
    FileNotInManifest,
    FileNotInMoab,
    FileNotInSignatureCatalog,
    InvalidManifest,
    SignatureCatalogNotInMoab,
    MoabChecksumValid,
    ZipPartsNotCreated,
    ZipPartsCountInconsistency,
    ZipPartsCountDiffersFromActual,
    ZipPartsSizeInconsistency,
    ZipPartsNotAllReplicated,
    ZipPartNotFound,
    ZipPartChecksumMismatch,
    ZipPartDelivered,
}

impl ResultCode {
    /// Stable camelCase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ResultCode::VersionMatches => "versionMatches",
            ResultCode::ActualVersGreaterThanCatalog => "actualVersGreaterThanCatalog",
            ResultCode::UnexpectedVersion => "unexpectedVersion",
            ResultCode::CatalogVersionsDisagree => "catalogVersionsDisagree",
            ResultCode::CreatedNewObject => "createdNewObject",
            ResultCode::ObjectAlreadyInCatalog => "objectAlreadyInCatalog",
            ResultCode::ObjectNotInCatalog => "objectNotInCatalog",
            ResultCode::RecordStatusChanged => "recordStatusChanged",
            ResultCode::UnableToCheckStatus => "unableToCheckStatus",
            ResultCode::MoabNotFound => "moabNotFound",
            ResultCode::InvalidMoab => "invalidMoab",
            ResultCode::InvalidArguments => "invalidArguments",
            ResultCode::DbUpdateFailed => "dbUpdateFailed",
            ResultCode::ChecksumMismatch => "checksumMismatch",
            ResultCode::FileNotInManifest => "fileNotInManifest",
            ResultCode::FileNotInMoab => "fileNotInMoab",
            ResultCode::FileNotInSignatureCatalog => "fileNotInSignatureCatalog",
            ResultCode::InvalidManifest => "invalidManifest",
            ResultCode::SignatureCatalogNotInMoab => "signatureCatalogNotInMoab",
            ResultCode::MoabChecksumValid => "moabChecksumValid",
            ResultCode::ZipPartsNotCreated => "zipPartsNotCreated",
            ResultCode::ZipPartsCountInconsistency => "zipPartsCountInconsistency",
            ResultCode::ZipPartsCountDiffersFromActual => "zipPartsCountDiffersFromActual",
            ResultCode::ZipPartsSizeInconsistency => "zipPartsSizeInconsistency",
            ResultCode::ZipPartsNotAllReplicated => "zipPartsNotAllReplicated",
            ResultCode::ZipPartNotFound => "zipPartNotFound",
            ResultCode::ZipPartChecksumMismatch => "zipPartChecksumMismatch",
            ResultCode::ZipPartDelivered => "zipPartDelivered",
        }
    }

    /// The message template for this code, with `%{named}` placeholders.
    pub fn template(self) -> &'static str {
        match self {
            ResultCode::VersionMatches => {
                "actual version (%{actual_version}) matches %{db_obj_name} db version"
            }
            ResultCode::ActualVersGreaterThanCatalog => {
                "actual version (%{actual_version}) greater than %{db_obj_name} \
                 db version (%{db_obj_version})"
            }
            ResultCode::UnexpectedVersion => {
                "actual version (%{actual_version}) has unexpected relationship to \
                 %{db_obj_name} db version (%{db_obj_version}); ERROR!"
            }
            ResultCode::CatalogVersionsDisagree => {
                "catalog version (%{catalog_version}) does not match preservation \
                 object current version (%{object_version})"
            }
            ResultCode::CreatedNewObject => "added object to catalog with status %{status}",
            ResultCode::ObjectAlreadyInCatalog => "%{druid} already exists in catalog",
            ResultCode::ObjectNotInCatalog => "%{druid} not found in catalog",
            ResultCode::RecordStatusChanged => {
                "catalog record status changed from %{old_status} to %{new_status}"
            }
            ResultCode::UnableToCheckStatus => {
                "unable to check status; current status is %{current_status} and \
                 only a fixity re-validation may clear it"
            }
            ResultCode::MoabNotFound => "moab not found for %{druid} on %{storage_root}",
            ResultCode::InvalidMoab => "invalid moab, validation errors: %{errors}",
            ResultCode::InvalidArguments => "invalid arguments: %{errors}",
            ResultCode::DbUpdateFailed => "db update failed: %{error_class}: %{error_message}",
            ResultCode::ChecksumMismatch => {
                "checksum mismatch for %{file_path} in version %{version}"
            }
            ResultCode::FileNotInManifest => {
                "%{file_path} found on disk but missing from manifest inventory"
            }
            ResultCode::FileNotInMoab => "%{file_path} listed in manifest but not found in moab",
            ResultCode::FileNotInSignatureCatalog => {
                "%{file_path} found in moab but missing from latest signature catalog"
            }
            ResultCode::InvalidManifest => {
                "unable to parse %{manifest_file_path}: %{error_message}"
            }
            ResultCode::SignatureCatalogNotInMoab => {
                "latest signature catalog missing from moab: %{manifest_file_path}"
            }
            ResultCode::MoabChecksumValid => "moab checksums match latest signature catalog",
            ResultCode::ZipPartsNotCreated => {
                "%{version} on %{endpoint_name}: no zip_parts exist yet for this \
                 replica version"
            }
            ResultCode::ZipPartsCountInconsistency => {
                "%{version} on %{endpoint_name}: zip_parts disagree on declared \
                 parts count: %{counts}"
            }
            ResultCode::ZipPartsCountDiffersFromActual => {
                "%{version} on %{endpoint_name}: declared parts count (%{db_count}) \
                 differs from actual parts count (%{actual_count})"
            }
            ResultCode::ZipPartsSizeInconsistency => {
                "%{version} on %{endpoint_name}: sum of zip part sizes \
                 (%{total_part_size}) is less than moab version size (%{moab_size})"
            }
            ResultCode::ZipPartsNotAllReplicated => {
                "%{version} on %{endpoint_name}: %{unreplicated_count} zip part(s) \
                 not yet replicated"
            }
            ResultCode::ZipPartNotFound => {
                "%{version} on %{endpoint_name}: zip part %{suffix} not found on endpoint"
            }
            ResultCode::ZipPartChecksumMismatch => {
                "%{version} on %{endpoint_name}: zip part %{suffix} checksum %{md5} \
                 does not match endpoint metadata %{replicated_md5}"
            }
            ResultCode::ZipPartDelivered => {
                "%{version} on %{endpoint_name}: zip part %{suffix} delivered \
                 (%{size} bytes, md5 %{md5})"
            }
        }
    }

    /// True when the rendered message claims that a catalog write happened.
    ///
    /// Findings with these codes are stripped from the ledger when the
    /// wrapping transaction fails, so a reported ledger never claims a
    /// mutation that did not durably happen.
    pub fn is_write_dependent(self) -> bool {
        matches!(
            self,
            ResultCode::CreatedNewObject
                | ResultCode::RecordStatusChanged
                | ResultCode::ZipPartDelivered
        )
    }

    /// Render the template with named arguments.
    ///
    /// A placeholder with no matching argument renders as-is, which unit
    /// tests treat as a template/argument drift bug.
    pub fn render(self, args: &[(&str, String)]) -> String {
        let mut message = self.template().to_string();
        for (name, value) in args {
            message = message.replace(&format!("%{{{name}}}"), value);
        }
        message
    }

    /// Recover the substituted argument values from a rendered message.
    ///
    /// Inverse of [`render`](Self::render) as long as substituted values do
    /// not themselves contain the literal text between placeholders. Used by
    /// reporters that need structured values back out of a ledger entry.
    pub fn extract_args(self, rendered: &str) -> Option<Vec<(String, String)>> {
        let template = self.template();
        let mut args = Vec::new();
        let mut t = template;
        let mut r = rendered;

        while let Some(open) = t.find("%{") {
            let (literal, rest) = t.split_at(open);
            r = r.strip_prefix(literal)?;
            let close = rest.find('}')?;
            let name = &rest[2..close];
            t = &rest[close + 1..];

            // Capture up to the next literal run (or end of template).
            let next_literal_end = t.find("%{").unwrap_or(t.len());
            let next_literal = &t[..next_literal_end];
            let value_end = if next_literal.is_empty() {
                r.len()
            } else {
                r.find(next_literal)?
            };
            args.push((name.to_string(), r[..value_end].to_string()));
            r = &r[value_end..];
        }
        r.strip_prefix(t)?;
        Some(args)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One finding in a ledger: a code plus its rendered message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditFinding {
    code: ResultCode,
    message: String,
    /// Assigned at creation: this finding records a status transition whose
    /// new status is `ok`. The sole input to the completed/error partition.
    transitioned_to_ok: bool,
}

impl AuditFinding {
    pub fn code(&self) -> ResultCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The one named predicate behind the completed/error partition.
    ///
    /// Deliberately narrow: only a `recordStatusChanged` whose new status is
    /// `ok` counts. Informational findings such as `versionMatches` do not.
    /// External reporters depend on this exact split.
    pub fn records_transition_to_ok(&self) -> bool {
        self.transitioned_to_ok
    }
}

impl Serialize for AuditFinding {
    /// `{"<code>": "<message>"}` - one single-entry object per finding.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.code.as_str(), &self.message)?;
        map.end()
    }
}

/// The ledger for one audit invocation.
///
/// Carries the subject identity and an ordered sequence of findings.
/// Ephemeral by contract: reported, then dropped.
#[derive(Clone, Debug)]
pub struct AuditResults {
    subject_id: String,
    storage_location: Option<String>,
    actual_version: Option<VersionNumber>,
    check_name: String,
    findings: Vec<AuditFinding>,
}

impl AuditResults {
    pub fn new(subject_id: ObjectId, check_name: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            storage_location: None,
            actual_version: None,
            check_name: check_name.into(),
            findings: Vec::new(),
        }
    }

    /// Ledger for input that failed identifier validation.
    ///
    /// Every invocation must yield a ledger, including ones whose subject
    /// never parsed; the raw input is carried as the subject label.
    pub fn for_raw_subject(subject: impl Into<String>, check_name: impl Into<String>) -> Self {
        Self {
            subject_id: subject.into(),
            storage_location: None,
            actual_version: None,
            check_name: check_name.into(),
            findings: Vec::new(),
        }
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn check_name(&self) -> &str {
        &self.check_name
    }

    pub fn storage_location(&self) -> Option<&str> {
        self.storage_location.as_deref()
    }

    pub fn set_storage_location(&mut self, label: impl Into<String>) {
        self.storage_location = Some(label.into());
    }

    pub fn actual_version(&self) -> Option<VersionNumber> {
        self.actual_version
    }

    pub fn set_actual_version(&mut self, version: VersionNumber) {
        self.actual_version = Some(version);
    }

    /// Render `code` with `args` and append the finding.
    pub fn add_result(&mut self, code: ResultCode, args: &[(&str, String)]) {
        let transitioned_to_ok = code == ResultCode::RecordStatusChanged
            && args
                .iter()
                .any(|(name, value)| *name == "new_status" && value == "ok");
        self.findings.push(AuditFinding {
            code,
            message: code.render(args),
            transitioned_to_ok,
        });
    }

    /// Append a finding whose template has no placeholders.
    pub fn add_plain(&mut self, code: ResultCode) {
        self.add_result(code, &[]);
    }

    pub fn findings(&self) -> &[AuditFinding] {
        &self.findings
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// No findings at all. For a fixity pass this is the "valid" verdict.
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn contains(&self, code: ResultCode) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }

    /// Findings that record a status transition to `ok`.
    pub fn completed_results(&self) -> Vec<&AuditFinding> {
        self.findings
            .iter()
            .filter(|f| f.records_transition_to_ok())
            .collect()
    }

    /// Everything that is not a transition to `ok`, informational findings
    /// included.
    pub fn error_results(&self) -> Vec<&AuditFinding> {
        self.findings
            .iter()
            .filter(|f| !f.records_transition_to_ok())
            .collect()
    }

    /// Strip findings that claim a durable catalog write.
    ///
    /// Invoked when the wrapping transaction fails; the surviving ledger
    /// reports only what was actually observed.
    pub fn remove_write_confirmed_results(&mut self) {
        self.findings.retain(|f| !f.code.is_write_dependent());
    }

    /// Stable JSON shape: `{"subjectId": ..., "results": [{code: msg}, ...]}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!(null))
    }
}

impl Serialize for AuditResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Shape<'a> {
            #[serde(rename = "subjectId")]
            subject_id: &'a str,
            results: Findings<'a>,
        }
        struct Findings<'a>(&'a [AuditFinding]);
        impl Serialize for Findings<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
                for finding in self.0 {
                    seq.serialize_element(finding)?;
                }
                seq.end()
            }
        }
        Shape {
            subject_id: &self.subject_id,
            results: Findings(&self.findings),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> ObjectId {
        ObjectId::parse("bj102hs9687").unwrap()
    }

    fn ledger() -> AuditResults {
        AuditResults::new(subject(), "moab-to-catalog")
    }

    #[test]
    fn test_render_substitutes_named_placeholders() {
        let message = ResultCode::VersionMatches.render(&[
            ("actual_version", "3".to_string()),
            ("db_obj_name", "CatalogRecord".to_string()),
        ]);
        assert_eq!(message, "actual version (3) matches CatalogRecord db version");
    }

    #[test]
    fn test_render_extract_round_trip_version_templates() {
        for (code, args) in [
            (
                ResultCode::UnexpectedVersion,
                vec![
                    ("actual_version", "2".to_string()),
                    ("db_obj_name", "CatalogRecord".to_string()),
                    ("db_obj_version", "3".to_string()),
                ],
            ),
            (
                ResultCode::RecordStatusChanged,
                vec![
                    ("old_status", "ok".to_string()),
                    ("new_status", "unexpected_version_on_storage".to_string()),
                ],
            ),
            (
                ResultCode::ZipPartsCountDiffersFromActual,
                vec![
                    ("version", "3".to_string()),
                    ("endpoint_name", "aws-east".to_string()),
                    ("db_count", "3".to_string()),
                    ("actual_count", "2".to_string()),
                ],
            ),
        ] {
            let rendered = code.render(&args);
            let extracted = code.extract_args(&rendered).expect("extraction failed");
            let expected: Vec<(String, String)> = args
                .iter()
                .map(|(n, v)| (n.to_string(), v.clone()))
                .collect();
            assert_eq!(extracted, expected, "round trip for {code}");
        }
    }

    #[test]
    fn test_extract_rejects_foreign_message() {
        assert!(ResultCode::VersionMatches
            .extract_args("something else entirely")
            .is_none());
    }

    #[test]
    fn test_every_template_placeholder_renders() {
        // Each code's template must only reference placeholders its callers
        // supply; a leftover %{...} in a rendered message is drift.
        let all_args: Vec<(&str, String)> = [
            "actual_version",
            "db_obj_name",
            "db_obj_version",
            "catalog_version",
            "object_version",
            "status",
            "druid",
            "old_status",
            "new_status",
            "current_status",
            "storage_root",
            "errors",
            "error_class",
            "error_message",
            "file_path",
            "version",
            "manifest_file_path",
            "endpoint_name",
            "counts",
            "db_count",
            "actual_count",
            "total_part_size",
            "moab_size",
            "unreplicated_count",
            "suffix",
            "md5",
            "replicated_md5",
            "size",
        ]
        .iter()
        .map(|n| (*n, "x".to_string()))
        .collect();

        for code in [
            ResultCode::VersionMatches,
            ResultCode::ActualVersGreaterThanCatalog,
            ResultCode::UnexpectedVersion,
            ResultCode::CatalogVersionsDisagree,
            ResultCode::CreatedNewObject,
            ResultCode::ObjectAlreadyInCatalog,
            ResultCode::ObjectNotInCatalog,
            ResultCode::RecordStatusChanged,
            ResultCode::UnableToCheckStatus,
            ResultCode::MoabNotFound,
            ResultCode::InvalidMoab,
            ResultCode::InvalidArguments,
            ResultCode::DbUpdateFailed,
            ResultCode::ChecksumMismatch,
            ResultCode::FileNotInManifest,
            ResultCode::FileNotInMoab,
            ResultCode::FileNotInSignatureCatalog,
            ResultCode::InvalidManifest,
            ResultCode::SignatureCatalogNotInMoab,
            ResultCode::MoabChecksumValid,
            ResultCode::ZipPartsNotCreated,
            ResultCode::ZipPartsCountInconsistency,
            ResultCode::ZipPartsCountDiffersFromActual,
            ResultCode::ZipPartsSizeInconsistency,
            ResultCode::ZipPartsNotAllReplicated,
            ResultCode::ZipPartNotFound,
            ResultCode::ZipPartChecksumMismatch,
            ResultCode::ZipPartDelivered,
        ] {
            let rendered = code.render(&all_args);
            assert!(
                !rendered.contains("%{"),
                "unrendered placeholder in {code}: {rendered}"
            );
        }
    }

    #[test]
    fn test_partition_counts_only_transitions_to_ok() {
        let mut results = ledger();
        results.add_result(
            ResultCode::VersionMatches,
            &[
                ("actual_version", "3".to_string()),
                ("db_obj_name", "CatalogRecord".to_string()),
            ],
        );
        results.add_result(
            ResultCode::RecordStatusChanged,
            &[
                ("old_status", "validity_unknown".to_string()),
                ("new_status", "ok".to_string()),
            ],
        );
        results.add_result(
            ResultCode::RecordStatusChanged,
            &[
                ("old_status", "ok".to_string()),
                ("new_status", "invalid_moab".to_string()),
            ],
        );

        let completed = results.completed_results();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].code(), ResultCode::RecordStatusChanged);
        assert!(completed[0].message().ends_with("to ok"));

        // versionMatches is informational but still lands in the error
        // partition; reporters rely on this split.
        let errors = results.error_results();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].code(), ResultCode::VersionMatches);
    }

    #[test]
    fn test_remove_write_confirmed_results_strips_all_tagged_codes() {
        let mut results = ledger();
        results.add_result(
            ResultCode::CreatedNewObject,
            &[("status", "validity_unknown".to_string())],
        );
        results.add_result(
            ResultCode::RecordStatusChanged,
            &[
                ("old_status", "ok".to_string()),
                ("new_status", "invalid_moab".to_string()),
            ],
        );
        results.add_result(
            ResultCode::MoabNotFound,
            &[
                ("druid", "bj102hs9687".to_string()),
                ("storage_root", "root-01".to_string()),
            ],
        );

        results.remove_write_confirmed_results();

        assert_eq!(results.len(), 1);
        assert!(results.findings().iter().all(|f| !f.code().is_write_dependent()));
        assert!(results.contains(ResultCode::MoabNotFound));
    }

    #[test]
    fn test_json_shape_is_stable() {
        let mut results = ledger();
        results.add_result(
            ResultCode::VersionMatches,
            &[
                ("actual_version", "3".to_string()),
                ("db_obj_name", "CatalogRecord".to_string()),
            ],
        );

        let json = results.to_json();
        assert_eq!(json["subjectId"], "bj102hs9687");
        assert_eq!(
            json["results"][0]["versionMatches"],
            "actual version (3) matches CatalogRecord db version"
        );
    }

    #[test]
    fn test_empty_ledger_is_fixity_valid() {
        let results = ledger();
        assert!(results.is_empty());
        assert!(results.completed_results().is_empty());
        assert!(results.error_results().is_empty());
    }
}
