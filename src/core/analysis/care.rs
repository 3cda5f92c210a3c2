use super::keywords::Condition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CareGuide {
    pub severity: &'static str,
    pub treatments: &'static [&'static str],
    pub urgent: bool,
}

pub fn care_guide(condition: Condition) -> CareGuide {
    match condition {
        Condition::Akiec => CareGuide {
            severity: "High - Pre-cancerous",
            treatments: &[
                "Topical creams: Imiquimod, 5-fluorouracil (5-FU)",
                "Cryotherapy (freezing with liquid nitrogen)",
                "Photodynamic therapy (PDT)",
                "Chemical peels",
                "Surgical excision for advanced cases",
                "Sun protection and preventive measures",
            ],
            urgent: true,
        },
        Condition::Bcc => CareGuide {
            severity: "High - Skin Cancer",
            treatments: &[
                "Mohs micrographic surgery (most effective)",
                "Surgical excision",
                "Curettage and electrodesiccation",
                "Cryotherapy",
                "Radiation therapy",
                "Topical imiquimod or 5-FU for small lesions",
            ],
            urgent: true,
        },
        Condition::Bkl => CareGuide {
            severity: "Low - Benign",
            treatments: &[
                "Observation (no treatment needed if not bothersome)",
                "Cryotherapy (freezing)",
                "Surgical removal for cosmetic reasons",
                "Laser treatment",
                "Chemical peels",
                "Topical tretinoin may help",
            ],
            urgent: false,
        },
        Condition::Df => CareGuide {
            severity: "Low - Benign",
            treatments: &[
                "Observation (usually no treatment needed)",
                "Surgical excision for cosmetic concerns",
                "Cryotherapy",
                "Laser treatment",
                "Intralesional steroid injections",
            ],
            urgent: false,
        },
        Condition::Mel => CareGuide {
            severity: "Critical - Melanoma",
            treatments: &[
                "URGENT: Surgical excision with wide margins",
                "Sentinel lymph node biopsy",
                "Immunotherapy (pembrolizumab, nivolumab)",
                "Targeted therapy for BRAF mutations",
                "Chemotherapy if advanced",
                "Radiation therapy for metastatic disease",
            ],
            urgent: true,
        },
        Condition::Nv => CareGuide {
            severity: "Low - Benign",
            treatments: &[
                "Observation (no treatment needed)",
                "Surgical removal for cosmetic reasons",
                "Laser treatment",
                "Cryotherapy",
                "Dermabrasion",
            ],
            urgent: false,
        },
        Condition::Vasc => CareGuide {
            severity: "Low to Moderate",
            treatments: &[
                "Observation for small lesions",
                "Laser therapy (most effective)",
                "Cryotherapy",
                "Sclerotherapy (injection)",
                "Surgical removal",
                "Topical treatments",
            ],
            urgent: false,
        },
        Condition::Unknown => CareGuide {
            severity: "Unknown",
            treatments: &[
                "Consult a dermatologist for proper diagnosis",
                "Provide detailed description and photos",
                "Professional medical evaluation recommended",
            ],
            urgent: false,
        },
    }
}
