//! Plain-text rendering of a case record.

use std::fmt::{self, Write};

use juscrape_core::{Case, DocketEntry, Party, Tag};
use time::OffsetDateTime;
use time::macros::format_description;

fn date(value: &OffsetDateTime) -> String {
    value
        .format(format_description!("[day]/[month]/[year] [hour]:[minute]"))
        .unwrap_or_else(|_| value.to_string())
}

fn tags(tags: &[Tag]) -> String {
    tags.iter().map(|tag| tag.value.as_str()).collect::<Vec<_>>().join(" / ")
}

fn party(out: &mut String, person: &Party, indent: &str) -> fmt::Result {
    write!(out, "{}- {}", indent, person.name)?;
    if let Some(cpf) = person.cpf() {
        write!(out, " (CPF {})", cpf)?;
    } else if let Some(cnpj) = person.cnpj() {
        write!(out, " (CNPJ {})", cnpj)?;
    }
    if let Some(oab) = &person.oab {
        write!(out, " OAB {}", oab)?;
    }
    writeln!(out)?;

    for line in [&person.address, &person.email, &person.phone].into_iter().flatten() {
        writeln!(out, "{}  {}", indent, line)?;
    }
    for lawyer in &person.lawyers {
        party(out, lawyer, &format!("{}    ", indent))?;
    }
    Ok(())
}

fn entry(out: &mut String, entry: &DocketEntry) -> fmt::Result {
    let marker = if entry.cancelled { " [cancelled]" } else { "" };
    writeln!(out, "  {}  {}{}", date(&entry.date), entry.label, marker)?;
    if let Some(observation) = &entry.observation {
        for line in observation.lines() {
            writeln!(out, "      {}", line)?;
        }
    }
    for error in &entry.errors {
        writeln!(out, "      ! {}", error)?;
    }
    Ok(())
}

/// Renders `case` as an indented report.
pub fn render_text(case: &Case) -> Result<String, fmt::Error> {
    let mut out = String::new();

    writeln!(out, "Case: {}", case.number)?;
    writeln!(out, "System: {}", case.system)?;
    if let Some(url) = &case.url {
        writeln!(out, "URL: {}", url)?;
    }
    if let Some(filed) = &case.filing_date {
        writeln!(out, "Filed: {}", date(filed))?;
    }
    if let Some(value) = case.claim_value {
        writeln!(out, "Claim value: R$ {:.2}", value)?;
    }
    if !case.action_types.is_empty() {
        writeln!(out, "Action: {}", tags(&case.action_types))?;
    }
    if !case.causes_of_action.is_empty() {
        writeln!(out, "Causes: {}", tags(&case.causes_of_action))?;
    }
    if let Some(unit) = &case.judicial_unit {
        writeln!(out, "Unit: {}", unit.name)?;
    }
    if let Some(judge) = &case.judge {
        writeln!(out, "Judge: {}", judge)?;
    }
    if let Some(secrecy) = case.secrecy {
        writeln!(out, "Secrecy: {}", if secrecy { "yes" } else { "no" })?;
    }
    if let Some(hearing) = &case.next_hearing {
        writeln!(out, "Next hearing: {} ({})", date(&hearing.date), hearing.label)?;
    }

    for (title, parties) in [("Claimants", &case.claimants), ("Respondents", &case.respondents), ("Others", &case.others)] {
        if parties.is_empty() {
            continue;
        }
        writeln!(out, "\n{}:", title)?;
        for found in parties {
            party(&mut out, found, "  ")?;
        }
    }

    if !case.docket.is_empty() {
        writeln!(out, "\nDocket:")?;
        for found in &case.docket {
            entry(&mut out, found)?;
        }
    }

    if !case.errors.is_empty() {
        writeln!(out, "\nErrors:")?;
        for error in &case.errors {
            writeln!(out, "  {}", error)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use juscrape_core::{CourtSystem, PartyRole, TaxId};
    use time::macros::datetime;

    #[test]
    fn test_render_text() {
        let mut case = Case::new("0000001-02.2023.8.05.0001", CourtSystem::ProjudiTjba);
        let mut claimant = Party::new("JOÃO DA SILVA", PartyRole::Claimant, TaxId::classify("123.456.789-01", ""));
        claimant.lawyers.push(Party::lawyer("MARIA SOUZA", TaxId::Unknown, Some("BA12345".to_string())));
        case.claimants.push(claimant);

        let mut cancelled = DocketEntry::new("Despacho", datetime!(2023-01-25 0:00 -3));
        cancelled.cancelled = true;
        cancelled.observation = Some("Cite-se.".to_string());
        case.docket.push(cancelled);

        let text = render_text(&case).unwrap();
        assert!(text.starts_with("Case: 0000001-02.2023.8.05.0001\nSystem: projudiTjba\n"));
        assert!(text.contains("  - JOÃO DA SILVA (CPF 12345678901)\n"));
        assert!(text.contains("      - MARIA SOUZA OAB BA12345\n"));
        assert!(text.contains("  25/01/2023 00:00  Despacho [cancelled]\n      Cite-se.\n"));
    }
}
