//! PREMIS payloads: rights statements, events, agents and file objects.

use chrono::SecondsFormat;
use reingest_store::{AgentRecord, EventRecord, FileRecord, RightsBasis, RightsRecord};
use reingest_xml::Element;
use uuid::Uuid;

use super::{XSI_NS, wrap};
use crate::model::{MetsNames, Subsection};

const PREMIS_NS: &str = "info:lc/xmlns/premis-v2";
const PREMIS_SCHEMA: &str =
    "info:lc/xmlns/premis-v2 http://www.loc.gov/standards/premis/v2/premis-v2-2.xsd";
const PREMIS_VERSION: &str = "2.2";

fn p(local: &str) -> String {
    format!("premis:{local}")
}

/// A namespaced PREMIS root element.
fn premis_root(local: &str) -> Element {
    Element::new(p(local))
        .with_attr("xmlns:premis", PREMIS_NS)
        .with_attr("xmlns:xsi", XSI_NS)
        .with_attr("xsi:schemaLocation", PREMIS_SCHEMA)
        .with_attr("version", PREMIS_VERSION)
}

/// `<premis:{outer}><premis:{outer}Type/><premis:{outer}Value/></premis:{outer}>`.
fn identifier(outer: &str, kind: &str, value: &str) -> Element {
    Element::new(p(outer))
        .with_text_child(&p(&format!("{outer}Type")), Some(kind))
        .with_text_child(&p(&format!("{outer}Value")), Some(value))
}

/// Append `child` only if it ended up with content.
fn with_nonempty(parent: Element, child: Element) -> Element {
    if child.has_child_elements() {
        parent.with_child(child)
    } else {
        parent
    }
}

// ---------------------------------------------------------------------------
// Rights
// ---------------------------------------------------------------------------

/// A `PREMIS:RIGHTS` payload for one statement, linked to `object`.
#[must_use]
pub fn rights_statement(names: &MetsNames, record: &RightsRecord, object: Option<Uuid>) -> Element {
    let detail = &record.detail;
    let mut statement = premis_root("rightsStatement")
        .with_child(identifier(
            "rightsStatementIdentifier",
            &record.identifier_type,
            &record.identifier_value,
        ))
        .with_text_child(&p("rightsBasis"), Some(record.basis.as_str()));

    let information = match record.basis {
        RightsBasis::Copyright => Element::new(p("copyrightInformation"))
            .with_text_child(&p("copyrightStatus"), detail.copyright_status.as_deref())
            .with_text_child(
                &p("copyrightJurisdiction"),
                detail.copyright_jurisdiction.as_deref(),
            )
            .with_text_child(
                &p("copyrightStatusDeterminationDate"),
                detail.copyright_determination_date.as_deref(),
            )
            .with_text_child(&p("copyrightNote"), detail.note.as_deref()),
        RightsBasis::License => Element::new(p("licenseInformation"))
            .with_text_child(&p("licenseTerms"), detail.license_terms.as_deref())
            .with_text_child(&p("licenseNote"), detail.note.as_deref()),
        RightsBasis::Statute => Element::new(p("statuteInformation"))
            .with_text_child(
                &p("statuteJurisdiction"),
                detail.statute_jurisdiction.as_deref(),
            )
            .with_text_child(&p("statuteCitation"), detail.statute_citation.as_deref())
            .with_text_child(
                &p("statuteInformationDeterminationDate"),
                detail.statute_determination_date.as_deref(),
            )
            .with_text_child(&p("statuteNote"), detail.note.as_deref()),
        RightsBasis::Donor | RightsBasis::Policy | RightsBasis::Other => {
            Element::new(p("otherRightsInformation"))
                .with_text_child(&p("otherRightsBasis"), Some(record.basis.as_str()))
                .with_text_child(&p("otherRightsNote"), detail.note.as_deref())
        }
    };
    statement = with_nonempty(statement, information);

    for grant in &record.granted {
        let end = if grant.end_open {
            Some("OPEN")
        } else {
            grant.end_date.as_deref()
        };
        let term = Element::new(p("termOfGrant"))
            .with_text_child(&p("startDate"), grant.start_date.as_deref())
            .with_text_child(&p("endDate"), end);
        let granted = Element::new(p("rightsGranted"))
            .with_text_child(&p("act"), Some(grant.act.as_str()))
            .with_text_child(&p("restriction"), grant.restriction.as_deref());
        let granted = with_nonempty(granted, term)
            .with_text_child(&p("rightsGrantedNote"), grant.note.as_deref());
        statement = statement.with_child(granted);
    }

    if let Some(object) = object {
        statement = statement.with_child(identifier(
            "linkingObjectIdentifier",
            "UUID",
            &object.to_string(),
        ));
    }
    wrap(names, "PREMIS:RIGHTS", None, [statement])
}

// ---------------------------------------------------------------------------
// Events and agents
// ---------------------------------------------------------------------------

/// A `PREMIS:EVENT` payload.
#[must_use]
pub fn event(names: &MetsNames, record: &EventRecord) -> Element {
    let outcome_detail = record.outcome_detail.as_deref().map(|note| {
        Element::new(p("eventOutcomeDetail"))
            .with_text_child(&p("eventOutcomeDetailNote"), Some(note))
    });
    let mut outcome = Element::new(p("eventOutcomeInformation"))
        .with_text_child(&p("eventOutcome"), record.outcome.as_deref());
    if let Some(detail) = outcome_detail.filter(Element::has_child_elements) {
        outcome.push_child(detail);
    }

    let datetime = record
        .datetime
        .to_rfc3339_opts(SecondsFormat::Secs, false);
    let mut event = premis_root("event")
        .with_child(identifier(
            "eventIdentifier",
            "UUID",
            &record.event_id.to_string(),
        ))
        .with_text_child(&p("eventType"), Some(record.event_type.as_str()))
        .with_text_child(&p("eventDateTime"), Some(datetime.as_str()))
        .with_text_child(&p("eventDetail"), record.detail.as_deref());
    event = with_nonempty(event, outcome);
    for agent in &record.agents {
        event = event.with_child(identifier(
            "linkingAgentIdentifier",
            &agent.identifier_type,
            &agent.identifier_value,
        ));
    }
    wrap(names, "PREMIS:EVENT", None, [event])
}

/// A `PREMIS:AGENT` payload.
#[must_use]
pub fn agent(names: &MetsNames, record: &AgentRecord) -> Element {
    let agent = premis_root("agent")
        .with_child(identifier(
            "agentIdentifier",
            &record.identifier_type,
            &record.identifier_value,
        ))
        .with_text_child(&p("agentName"), Some(record.name.as_str()))
        .with_text_child(&p("agentType"), Some(record.agent_type.as_str()));
    wrap(names, "PREMIS:AGENT", None, [agent])
}

/// `agentIdentifierValue` of an agent subsection.
#[must_use]
pub fn agent_identifier(sub: &Subsection) -> Option<String> {
    sub.payload.descendant_text("agentIdentifierValue")
}

/// `eventIdentifierValue` of an event subsection.
#[must_use]
pub fn event_identifier(sub: &Subsection) -> Option<String> {
    sub.payload.descendant_text("eventIdentifierValue")
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

/// A `PREMIS:OBJECT` payload describing a file.
#[must_use]
pub fn file_object(names: &MetsNames, file: &FileRecord) -> Element {
    let mut characteristics = Element::new(p("objectCharacteristics"))
        .with_text_child(&p("compositionLevel"), Some("0"));
    if let Some(digest) = &file.checksum {
        characteristics.push_child(
            Element::new(p("fixity"))
                .with_text_child(
                    &p("messageDigestAlgorithm"),
                    file.checksum_type.as_deref(),
                )
                .with_text_child(&p("messageDigest"), Some(digest.as_str())),
        );
    }
    let size = file.size.map(|s| s.to_string());
    characteristics = characteristics.with_text_child(&p("size"), size.as_deref());

    let object = premis_root("object")
        .with_attr("xsi:type", "premis:file")
        .with_child(identifier(
            "objectIdentifier",
            "UUID",
            &file.content_id.to_string(),
        ))
        .with_child(characteristics)
        .with_text_child(&p("originalName"), Some(file.original_location.as_str()));
    wrap(names, "PREMIS:OBJECT", None, [object])
}
