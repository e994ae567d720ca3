//! Claim-specific agent prompt

use claimcall_core::Claim;

/// Build the prompt the voice agent dials with, filled in from the
/// claim, office and doctor fields.
pub fn build_claim_prompt(claim: &Claim) -> String {
    let office = claim.office_name.as_deref().unwrap_or("the billing office");
    let doctor = claim.doctor_name.as_deref().unwrap_or("the treating physician");

    format!(
        "You are a billing assistant calling {provider} on behalf of {office}. \
         You are following up on a denied insurance claim for patient {patient}, \
         treated by {doctor}. Ask the representative why the claim was denied, \
         write down every denial reason they give verbatim, and ask what the \
         next step is to get the claim resubmitted and accepted. Be polite and \
         concise, and confirm the reasons back before ending the call.",
        provider = claim.provider_name,
        office = office,
        patient = claim.patient_name,
        doctor = doctor,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_claim_fields() {
        let mut claim = Claim::new("Jane Roe", "Acme Health", None);
        claim.office_name = Some("Lakeside Family Practice".to_string());
        claim.doctor_name = Some("Dr. Chen".to_string());

        let prompt = build_claim_prompt(&claim);
        assert!(prompt.contains("Acme Health"));
        assert!(prompt.contains("Jane Roe"));
        assert!(prompt.contains("Lakeside Family Practice"));
        assert!(prompt.contains("Dr. Chen"));
    }

    #[test]
    fn test_prompt_falls_back_when_office_unknown() {
        let claim = Claim::new("Jane Roe", "Acme Health", None);
        let prompt = build_claim_prompt(&claim);
        assert!(prompt.contains("the billing office"));
        assert!(prompt.contains("the treating physician"));
    }
}
