//! Flow catalog: the intake questionnaires offered to prospects.
//!
//! The general survey branches on the prospect's industry into one role
//! question set and finishes with a shared wrap-up step. Each role that has
//! its own landing page also gets a standalone "information" flow made of
//! the same pieces: contact details, the role questions, and the wrap-up.
//! The general contact form is a single step of its own.

use indexmap::IndexMap;

use crate::error::ConfigError;

use super::controller::FlowController;
use super::field::FieldDef;
use super::graph::StepGraph;
use super::router::RoleRouter;
use super::step::FormStep;

pub const SURVEY_FLOW: &str = "survey";
pub const CONTACT_FLOW: &str = "contact";

pub mod steps {
    pub const GENERAL_INFO: &str = "general-info";
    pub const CONTACT_INFO: &str = "contact-info";
    pub const CONTACT: &str = "contact";
    pub const WRAP_UP: &str = "wrap-up";
}

/// Roles a prospect can pick, with the id prefix of their question set.
pub const ROLES: &[(&str, &str)] = &[
    ("Finance / Investors", "finance"),
    ("Construction / Design / Engineering", "construction"),
    ("Educators", "educators"),
    ("Government", "government"),
    ("Media", "media"),
    ("Nonprofits", "nonprofits"),
    ("Homeowners / Buyers", "homeowners"),
    ("Developers", "developers"),
];

/// Standalone information flows and the page each one confirms on.
const INFORMATION_FLOWS: &[(&str, &str)] = &[
    ("finance", "/finance/confirmation"),
    ("homeowners", "/homeowners/confirmation"),
    ("media", "/media/confirmation"),
    ("nonprofits", "/contact"),
    ("government", "/contact"),
    ("educators", "/contact"),
    ("developers", "/developer-dashboard"),
];

/// Role questions the standalone forms leave optional.
const INFORMATION_OPTIONAL: &[(&str, &[&str])] = &[
    ("finance", &["timeline"]),
    ("homeowners", &["timeline"]),
];

const PROJECT_TYPES: &[&str] = &["residential", "commercial", "infrastructure", "emergency", "custom"];

const REFERRAL_SOURCES: &[&str] = &["google", "social", "referral", "news", "conference", "other"];

/// All flows, keyed by flow id.
#[derive(Debug, Clone, Default)]
pub struct FlowCatalog {
    flows: IndexMap<String, FlowController>,
}

impl FlowCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The survey, every role information flow, and the contact form. Fails
    /// if any definition is inconsistent.
    pub fn standard() -> Result<Self, ConfigError> {
        let mut catalog = Self::new();
        catalog.register(survey()?)?;
        for (prefix, confirmation) in INFORMATION_FLOWS {
            catalog.register(information(prefix, confirmation)?)?;
        }
        catalog.register(contact()?)?;
        Ok(catalog)
    }

    pub fn register(&mut self, graph: StepGraph) -> Result<(), ConfigError> {
        let flow = graph.flow().to_string();
        if self.flows.contains_key(&flow) {
            return Err(ConfigError::DuplicateFlow(flow));
        }
        self.flows.insert(flow, FlowController::new(graph));
        Ok(())
    }

    pub fn get(&self, flow: &str) -> Option<&FlowController> {
        self.flows.get(flow)
    }

    pub fn flows(&self) -> impl Iterator<Item = &FlowController> {
        self.flows.values()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

/// Id of the role question step for `prefix`.
pub fn details_step(prefix: &str) -> String {
    format!("{prefix}-details")
}

/// Id of the standalone information flow for `prefix`.
pub fn information_flow(prefix: &str) -> String {
    format!("{prefix}-information")
}

/// General info → role questions → wrap-up.
pub fn survey() -> Result<StepGraph, ConfigError> {
    let labels: Vec<&str> = ROLES.iter().map(|(label, _)| *label).collect();
    let general = FormStep::new(steps::GENERAL_INFO, "General Information")
        .field(
            FieldDef::multi_select(
                "projectTypes",
                "Which types of 3D printed construction projects interest you?",
                PROJECT_TYPES,
            )
            .required(),
        )
        .field(FieldDef::single_select("industry", "Which industry best describes you?", &labels).required())
        .field(FieldDef::text("name", "Name").required())
        .field(FieldDef::text("email", "Email").required())
        .field(FieldDef::text("organization", "Organization"))
        .field(FieldDef::text("state", "State"))
        .branch_on("industry");

    let mut router = RoleRouter::new();
    let mut builder = StepGraph::builder(SURVEY_FLOW, steps::GENERAL_INFO).step(general);
    for (label, prefix) in ROLES {
        let step_id = details_step(prefix);
        router = router.route(label, &step_id);
        builder = builder.step(role_step(prefix)?.then(steps::WRAP_UP));
    }

    builder
        .step(wrap_up())
        .router(router)
        .confirmation("/survey/confirmation")
        .build()
}

/// Contact details → role questions → wrap-up, for one role.
pub fn information(prefix: &str, confirmation: &str) -> Result<StepGraph, ConfigError> {
    let details = details_step(prefix);
    let contact = FormStep::new(steps::CONTACT_INFO, "Contact Information")
        .field(FieldDef::text("name", "Name").required())
        .field(FieldDef::text("email", "Email").required())
        .field(FieldDef::text("phone", "Phone"))
        .field(FieldDef::text("organization", "Organization"))
        .field(FieldDef::text("state", "State"))
        .then(&details);

    StepGraph::builder(&information_flow(prefix), steps::CONTACT_INFO)
        .step(contact)
        .step(information_step(prefix)?.then(steps::WRAP_UP))
        .step(wrap_up())
        .confirmation(confirmation)
        .build()
}

/// The general "Contact Us" message form.
pub fn contact() -> Result<StepGraph, ConfigError> {
    let form = FormStep::new(steps::CONTACT, "Send us a Message")
        .field(FieldDef::text("name", "Name").required())
        .field(FieldDef::text("email", "Email").required())
        .field(FieldDef::text("phone", "Phone"))
        .field(FieldDef::text("company", "Company"))
        .field(FieldDef::single_select(
            "reason",
            "Reason for Contact",
            &[
                "General Inquiry",
                "Partnership Opportunity",
                "Investment Information",
                "Media Request",
                "Technical Support",
                "Career Opportunities",
                "Other",
            ],
        ))
        .field(FieldDef::single_select(
            "urgency",
            "Urgency Level",
            &[
                "Low - No rush",
                "Medium - Within a week",
                "High - Within 24 hours",
                "Urgent - Immediate response needed",
            ],
        ))
        .field(FieldDef::text("subject", "Subject"))
        .field(FieldDef::text("message", "Message").required())
        .field(FieldDef::boolean("agreeToContact", "I agree to be contacted regarding my inquiry").required())
        .field(FieldDef::boolean("agreeToTerms", "I agree to the Terms of Service and Privacy Policy").required())
        .submit();

    StepGraph::builder(CONTACT_FLOW, steps::CONTACT)
        .step(form)
        .confirmation("/contact")
        .build()
}

/// The role questions as the standalone form asks them.
fn information_step(prefix: &str) -> Result<FormStep, ConfigError> {
    let mut step = role_step(prefix)?;
    let optional = INFORMATION_OPTIONAL
        .iter()
        .find(|(p, _)| *p == prefix)
        .map_or(&[][..], |(_, fields)| *fields);
    for field in step.fields.iter_mut().filter(|f| optional.contains(&f.name.as_str())) {
        field.required = false;
    }
    Ok(step)
}

fn wrap_up() -> FormStep {
    FormStep::new(steps::WRAP_UP, "Almost Done!")
        .field(FieldDef::text(
            "additionalInfo",
            "Is there anything else you'd like us to know?",
        ))
        .field(FieldDef::multi_select(
            "followUpMethods",
            "How would you like us to follow up?",
            &[
                "Email updates about new projects",
                "Phone consultation with our team",
                "In-person meeting or site visit",
                "Investment opportunity details",
                "Technical specifications and materials",
                "Cost estimates and timeline",
                "Regulatory and permitting guidance",
                "Other",
            ],
        ))
        .field(FieldDef::single_select(
            "urgency",
            "How urgent is your project?",
            &[
                "Very urgent (within 1 month)",
                "Urgent (1-3 months)",
                "Moderate (3-6 months)",
                "Flexible (6+ months)",
                "Just exploring",
            ],
        ))
        .field(FieldDef::single_select(
            "referralSource",
            "How did you hear about us?",
            REFERRAL_SOURCES,
        ))
        .field(FieldDef::text("specificQuestions", "Do you have any specific questions?"))
        .field(FieldDef::boolean("agreeToContact", "I agree to be contacted about my inquiry").required())
        .field(FieldDef::boolean("agreeToTerms", "I agree to the terms and privacy policy").required())
        .submit()
}

/// Question set for one role. Unknown prefixes are a configuration error.
fn role_step(prefix: &str) -> Result<FormStep, ConfigError> {
    let id = details_step(prefix);
    let step = match prefix {
        "finance" => FormStep::new(&id, "Investment Details")
            .field(
                FieldDef::single_select(
                    "investmentSize",
                    "What is your typical investment size range?",
                    &[
                        "Under $100K",
                        "$100K - $500K",
                        "$500K - $1M",
                        "$1M - $5M",
                        "$5M - $10M",
                        "Over $10M",
                    ],
                )
                .required(),
            )
            .field(
                FieldDef::single_select(
                    "investmentType",
                    "What type of investment are you interested in?",
                    &[
                        "Equity Investment",
                        "Debt Financing",
                        "Project Financing",
                        "Technology Licensing",
                        "Joint Venture",
                        "Other",
                    ],
                )
                .required(),
            )
            .field(
                FieldDef::single_select(
                    "timeline",
                    "What is your investment timeline?",
                    &["immediate", "short", "medium", "long"],
                )
                .required(),
            )
            .field(FieldDef::single_select(
                "riskTolerance",
                "How would you describe your risk tolerance?",
                &["Conservative", "Moderate", "Aggressive", "Very Aggressive"],
            ))
            .field(FieldDef::single_select(
                "previousExperience",
                "Do you have previous experience with construction or real estate investments?",
                &["Yes, extensive", "Yes, some", "No, but interested", "No experience"],
            ))
            .field(FieldDef::text(
                "specificInterests",
                "What specific aspects of 3D printed construction interest you most?",
            )),

        "construction" => FormStep::new(&id, "Construction Details")
            .field(
                FieldDef::single_select(
                    "companySize",
                    "What is the size of your company?",
                    &[
                        "1-10 employees",
                        "11-50 employees",
                        "51-200 employees",
                        "201-500 employees",
                        "500+ employees",
                    ],
                )
                .required(),
            )
            .field(
                FieldDef::single_select(
                    "experienceLevel",
                    "What is your experience with 3D printing in construction?",
                    &[
                        "No experience with 3D printing",
                        "Some knowledge, no hands-on experience",
                        "Limited hands-on experience",
                        "Moderate experience",
                        "Extensive experience",
                    ],
                )
                .required(),
            )
            .field(
                FieldDef::multi_select(
                    "constructionProjectTypes",
                    "What types of projects do you work on?",
                    &[
                        "Residential construction",
                        "Commercial construction",
                        "Infrastructure projects",
                        "Custom architectural designs",
                        "Emergency/disaster relief",
                        "Research and development",
                    ],
                )
                .required(),
            )
            .field(FieldDef::text(
                "currentChallenges",
                "What are your biggest challenges in traditional construction?",
            ))
            .field(FieldDef::text(
                "technologyInterest",
                "What aspects of 3D printing technology interest you most?",
            ))
            .field(FieldDef::single_select(
                "collaborationInterest",
                "Are you interested in collaborating with us on projects?",
                &[
                    "Yes, very interested",
                    "Yes, somewhat interested",
                    "Maybe, need more information",
                    "No, just exploring",
                ],
            ))
            .field(FieldDef::single_select(
                "timeline",
                "When are you looking to adopt 3D printing?",
                &["immediate", "short", "medium", "long", "exploring"],
            ))
            .field(FieldDef::text("specificNeeds", "Any specific needs or requirements?")),

        "educators" => FormStep::new(&id, "Educational Program Details")
            .field(
                FieldDef::single_select(
                    "institutionType",
                    "Institution type",
                    &[
                        "K-12 School",
                        "Community College",
                        "University",
                        "Technical Institute",
                        "Trade School",
                        "Research Institution",
                        "Educational Nonprofit",
                        "Other",
                    ],
                )
                .required(),
            )
            .field(FieldDef::text("department", "Department").required())
            .field(FieldDef::multi_select(
                "academicDepartments",
                "Academic departments involved",
                &[
                    "Architecture",
                    "Engineering",
                    "Construction Management",
                    "Environmental Science",
                    "Urban Planning",
                    "Computer Science",
                    "Design",
                    "Business",
                    "Other",
                ],
            ))
            .field(FieldDef::multi_select(
                "programTypes",
                "Program types",
                &[
                    "Degree Program",
                    "Certificate Program",
                    "Continuing Education",
                    "Workshop/Short Course",
                    "Research Project",
                    "Student Competition",
                    "Faculty Development",
                    "Industry Partnership",
                ],
            ))
            .field(FieldDef::multi_select(
                "studentLevels",
                "Student levels",
                &[
                    "Elementary (K-5)",
                    "Middle School (6-8)",
                    "High School (9-12)",
                    "Undergraduate",
                    "Graduate",
                    "Professional Development",
                    "Mixed Levels",
                ],
            ))
            .field(FieldDef::multi_select(
                "interestAreas",
                "Areas of interest",
                &[
                    "3D Printing Technology",
                    "Sustainable Construction",
                    "Digital Fabrication",
                    "Building Information Modeling (BIM)",
                    "Materials Science",
                    "Project Management",
                    "Innovation in Construction",
                    "Career Preparation",
                ],
            ))
            .field(FieldDef::single_select(
                "budget",
                "Budget range",
                &[
                    "under-5k",
                    "5k-10k",
                    "10k-25k",
                    "25k-50k",
                    "50k-100k",
                    "over-100k",
                    "grant-funded",
                    "partnership",
                ],
            ))
            .field(FieldDef::single_select(
                "timeline",
                "Timeline",
                &["immediate", "short", "medium", "long", "planning"],
            ))
            .field(FieldDef::text("projectDescription", "Project description")),

        "government" => FormStep::new(&id, "Government Project Details")
            .field(
                FieldDef::single_select(
                    "governmentLevel",
                    "Level of government",
                    &["Federal", "State", "County", "City/Municipal", "Regional", "International"],
                )
                .required(),
            )
            .field(
                FieldDef::single_select(
                    "department",
                    "Department",
                    &[
                        "Housing & Urban Development",
                        "Transportation",
                        "Economic Development",
                        "Planning & Zoning",
                        "Public Works",
                        "Environmental Protection",
                        "Emergency Management",
                        "Other",
                    ],
                )
                .required(),
            )
            .field(FieldDef::multi_select(
                "governmentProjectTypes",
                "Project types",
                &[
                    "Affordable Housing",
                    "Emergency Housing",
                    "Public Infrastructure",
                    "Disaster Relief",
                    "Community Development",
                    "Urban Planning",
                    "Environmental Projects",
                    "Other",
                ],
            ))
            .field(FieldDef::single_select(
                "budget",
                "Budget range",
                &["Under $1M", "$1M - $5M", "$5M - $10M", "$10M - $25M", "$25M - $50M", "Over $50M"],
            ))
            .field(FieldDef::single_select(
                "timeline",
                "Timeline",
                &["immediate", "short", "medium", "long", "planning"],
            ))
            .field(FieldDef::text("jurisdiction", "Jurisdiction"))
            .field(FieldDef::text("population", "Population served"))
            .field(FieldDef::text("projectDescription", "Project description"))
            .field(FieldDef::text("communityImpact", "Expected community impact")),

        "media" => FormStep::new(&id, "Story Details")
            .field(
                FieldDef::single_select(
                    "mediaType",
                    "Media type",
                    &[
                        "Television",
                        "Radio/Podcast",
                        "Print/Newspaper",
                        "Online/Digital",
                        "Trade Publication",
                        "Blog/Influencer",
                    ],
                )
                .required(),
            )
            .field(
                FieldDef::single_select(
                    "storyType",
                    "Story type",
                    &[
                        "Technology Feature",
                        "Industry Analysis",
                        "Case Study",
                        "Company Profile",
                        "Trend Report",
                        "Expert Interview",
                    ],
                )
                .required(),
            )
            .field(FieldDef::text("audience", "Target audience"))
            .field(FieldDef::text("circulation", "Circulation / reach"))
            .field(FieldDef::date("deadline", "Deadline"))
            .field(FieldDef::text("storyRequirements", "Story requirements"))
            .field(FieldDef::boolean("siteVisit", "Request a site visit"))
            .field(FieldDef::boolean("pressKit", "Request a press kit"))
            .field(FieldDef::boolean("exclusiveAccess", "Request exclusive access"))
            .field(FieldDef::date("embargoDate", "Embargo date")),

        "nonprofits" => FormStep::new(&id, "Organization & Project Details")
            .field(
                FieldDef::single_select(
                    "organizationType",
                    "Organization type",
                    &[
                        "501(c)(3) Nonprofit",
                        "501(c)(4) Social Welfare",
                        "Community Development Corporation",
                        "Housing Authority",
                        "Religious Organization",
                        "Foundation",
                        "International NGO",
                        "Other",
                    ],
                )
                .required(),
            )
            .field(FieldDef::text("missionStatement", "Mission statement"))
            .field(FieldDef::text("projectDescription", "Project description").required())
            .field(FieldDef::text("projectLocation", "Project location").required())
            .field(FieldDef::single_select(
                "projectTimeline",
                "Project timeline",
                &[
                    "Immediate (0-6 months)",
                    "Short-term (6-12 months)",
                    "Medium-term (1-2 years)",
                    "Long-term (2+ years)",
                    "Flexible",
                ],
            ))
            .field(FieldDef::single_select(
                "budgetRange",
                "Budget range",
                &[
                    "Under $500K",
                    "$500K - $1M",
                    "$1M - $5M",
                    "$5M - $10M",
                    "$10M - $25M",
                    "Over $25M",
                ],
            ))
            .field(FieldDef::text("communityNeeds", "Community needs"))
            .field(FieldDef::text("expectedImpact", "Expected impact")),

        "homeowners" => FormStep::new(&id, "Your Dream Home")
            .field(
                FieldDef::single_select(
                    "homeType",
                    "What type of home are you interested in?",
                    &[
                        "Single Family Home",
                        "Townhouse",
                        "Condo/Apartment",
                        "Tiny Home",
                        "Custom Design",
                        "Multi-generational Home",
                    ],
                )
                .required(),
            )
            .field(
                FieldDef::single_select(
                    "budget",
                    "What is your budget range?",
                    &[
                        "Under $200K",
                        "$200K - $400K",
                        "$400K - $600K",
                        "$600K - $800K",
                        "$800K - $1M",
                        "Over $1M",
                    ],
                )
                .required(),
            )
            .field(
                FieldDef::single_select(
                    "timeline",
                    "When are you looking to build or buy?",
                    &[
                        "Immediate (0-6 months)",
                        "Short-term (6-12 months)",
                        "Medium-term (1-2 years)",
                        "Long-term (2+ years)",
                        "Just exploring",
                    ],
                )
                .required(),
            )
            .field(FieldDef::text("location", "Where would you like to build?"))
            .field(FieldDef::single_select(
                "familySize",
                "Family size",
                &["1", "2", "3-4", "5-6", "7+"],
            ))
            .field(FieldDef::single_select(
                "sustainability",
                "How important is sustainability to you?",
                &["Very Important", "Somewhat Important", "Not Very Important", "Not Important"],
            ))
            .field(FieldDef::single_select(
                "customDesign",
                "Are you interested in custom design options?",
                &["Yes, very interested", "Yes, somewhat", "No, prefer standard designs", "Not sure"],
            ))
            .field(FieldDef::text("financing", "How do you plan to finance your home?"))
            .field(FieldDef::text(
                "concerns",
                "What are your main concerns about 3D printed homes?",
            )),

        "developers" => FormStep::new(&id, "Development Project Information")
            .field(
                FieldDef::single_select(
                    "companyType",
                    "Company type",
                    &[
                        "Real Estate Developer",
                        "Construction Company",
                        "Investment Firm",
                        "REIT",
                        "Government Entity",
                        "Nonprofit Developer",
                        "International Developer",
                        "Other",
                    ],
                )
                .required(),
            )
            .field(FieldDef::text("projectName", "Project name").required())
            .field(FieldDef::text("projectLocation", "Project location").required())
            .field(FieldDef::text("projectDescription", "Project description").required())
            .field(FieldDef::multi_select(
                "developmentTypes",
                "Project types",
                &[
                    "Residential communities",
                    "Apartment complexes",
                    "Mixed-use developments",
                    "Office buildings",
                    "Retail centers",
                    "Industrial facilities",
                    "Hospitality projects",
                    "Affordable housing",
                    "Luxury developments",
                    "Senior living",
                    "Student housing",
                    "Public infrastructure",
                ],
            ))
            .field(FieldDef::text("estimatedUnits", "Estimated units"))
            .field(FieldDef::single_select(
                "projectTimeline",
                "Project timeline",
                &[
                    "Immediate (0-6 months)",
                    "Short-term (6-12 months)",
                    "Medium-term (1-2 years)",
                    "Long-term (2+ years)",
                    "Flexible",
                ],
            ))
            .field(FieldDef::single_select(
                "budgetRange",
                "Budget range",
                &[
                    "Under $10M",
                    "$10M - $25M",
                    "$25M - $50M",
                    "$50M - $100M",
                    "$100M - $250M",
                    "$250M - $500M",
                    "Over $500M",
                ],
            )),

        other => {
            return Err(ConfigError::InvalidValue {
                key: "role".to_string(),
                message: format!("no question set for role {other}"),
            });
        }
    };
    Ok(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FlowError, ValidationError};
    use crate::intake::field::{FieldKind, FieldValue};
    use crate::intake::session::{FlowSession, FlowStatus};
    use crate::intake::step::{Next, StepId};

    #[test]
    fn standard_catalog_builds() {
        let catalog = FlowCatalog::standard().unwrap();
        assert_eq!(catalog.len(), INFORMATION_FLOWS.len() + 2);
        assert!(catalog.get(SURVEY_FLOW).is_some());
        assert!(catalog.get(CONTACT_FLOW).is_some());
        assert!(catalog.get("media-information").is_some());
        assert!(catalog.get("construction-information").is_none());
    }

    #[test]
    fn every_offered_role_resolves_to_a_step() {
        let graph = survey().unwrap();
        let general = graph.step(&StepId::from(steps::GENERAL_INFO)).unwrap();
        let industry = general.find_field("industry").unwrap();
        assert_eq!(industry.options.len(), ROLES.len());

        for label in &industry.options {
            let target = graph.router().resolve(label).unwrap();
            assert!(graph.step(&target).is_some(), "{label} routes to missing {target}");
        }
        assert!(graph.router().resolve("Astronauts").is_err());
    }

    #[test]
    fn role_steps_lead_to_wrap_up() {
        let graph = survey().unwrap();
        for (_, prefix) in ROLES {
            let step = graph.step(&StepId::from(details_step(prefix))).unwrap();
            assert_eq!(step.next, Next::Step { id: steps::WRAP_UP.into() });
            assert!(step.fields.iter().any(|f| f.required), "{prefix} has no required field");
        }
    }

    #[test]
    fn field_names_do_not_collide_along_a_path() {
        // Steps on one path share the answer set, so a name reused between
        // general info, a role step, and wrap-up would clobber an answer.
        let graph = survey().unwrap();
        let general: Vec<&str> = graph
            .step(&StepId::from(steps::GENERAL_INFO))
            .unwrap()
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        let wrap: Vec<&str> = graph
            .step(&StepId::from(steps::WRAP_UP))
            .unwrap()
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        for (_, prefix) in ROLES {
            let step = graph.step(&StepId::from(details_step(prefix))).unwrap();
            for f in &step.fields {
                assert!(!general.contains(&f.name.as_str()), "{prefix}: {} shadows general info", f.name);
                assert!(!wrap.contains(&f.name.as_str()), "{prefix}: {} shadows wrap-up", f.name);
            }
        }
    }

    #[test]
    fn shared_field_names_only_carry_valid_answers_across_branches() {
        let catalog = FlowCatalog::standard().unwrap();
        let ctl = catalog.get(SURVEY_FLOW).unwrap();
        let mut s = ctl.start();
        ctl.set_field(&mut s, "projectTypes", FieldValue::from(&["residential"][..])).unwrap();
        ctl.set_field(&mut s, "industry", "Finance / Investors".into()).unwrap();
        ctl.set_field(&mut s, "name", "Ada".into()).unwrap();
        ctl.set_field(&mut s, "email", "ada@fund.example".into()).unwrap();
        let mut s = ctl.advance(&s).unwrap();
        ctl.set_field(&mut s, "timeline", "short".into()).unwrap();

        let mut s = ctl.retreat(&s);
        ctl.set_field(&mut s, "industry", "Homeowners / Buyers".into()).unwrap();
        let s = ctl.advance(&s).unwrap();
        assert_eq!(s.current, "homeowners-details");
        assert_eq!(ctl.field_value(&s, "timeline").unwrap(), FieldValue::from(""));
    }

    #[tokio::test]
    async fn homeowner_survey_submits_once() {
        use std::sync::Mutex;

        use async_trait::async_trait;

        use crate::error::SubmissionError;
        use crate::sink::{Receipt, Submission, SubmissionSink};

        #[derive(Default)]
        struct Recorder(Mutex<Vec<Submission>>);

        #[async_trait]
        impl SubmissionSink for Recorder {
            fn name(&self) -> &str {
                "recorder"
            }
            async fn submit(&self, submission: &Submission) -> Result<Receipt, SubmissionError> {
                self.0.lock().unwrap().push(submission.clone());
                Ok(Receipt::for_submission(submission, "recorder", "r-1"))
            }
        }

        let catalog = FlowCatalog::standard().unwrap();
        let ctl = catalog.get(SURVEY_FLOW).unwrap();
        let sink = Recorder::default();

        let mut s = ctl.start();
        ctl.set_field(&mut s, "projectTypes", FieldValue::from(&["residential"][..])).unwrap();
        ctl.set_field(&mut s, "industry", "Homeowners / Buyers".into()).unwrap();
        ctl.set_field(&mut s, "name", "Jane Doe".into()).unwrap();
        ctl.set_field(&mut s, "email", "jane@example.com".into()).unwrap();
        let mut s = ctl.advance(&s).unwrap();
        assert_eq!(s.current, "homeowners-details");

        let err = ctl.advance(&s).unwrap_err();
        assert!(matches!(err, FlowError::Validation(ValidationError::MissingField(ref f)) if f == "homeType"));

        ctl.set_field(&mut s, "homeType", "Tiny Home".into()).unwrap();
        ctl.set_field(&mut s, "budget", "$200K - $400K".into()).unwrap();
        ctl.set_field(&mut s, "timeline", "Immediate (0-6 months)".into()).unwrap();
        let mut s = ctl.advance(&s).unwrap();
        assert_eq!(s.current, steps::WRAP_UP);

        ctl.set_field(&mut s, "agreeToContact", true.into()).unwrap();
        ctl.set_field(&mut s, "agreeToTerms", true.into()).unwrap();
        let mut s = ctl.advance(&s).unwrap();
        assert!(sink.0.lock().unwrap().is_empty());

        let receipt = ctl.submit(&mut s, &sink).await.unwrap();
        assert_eq!(receipt.confirmation_path, "/survey/confirmation");

        let received = sink.0.lock().unwrap();
        assert_eq!(received.len(), 1);
        let answers = &received[0].answers;
        for field in [
            "projectTypes",
            "industry",
            "name",
            "email",
            "homeType",
            "budget",
            "timeline",
            "agreeToContact",
            "agreeToTerms",
        ] {
            assert!(answers.contains(field), "missing {field}");
        }
        assert_eq!(answers.text("homeType"), Some("Tiny Home"));
    }

    #[test]
    fn information_flow_confirms_on_role_page() {
        let graph = information("finance", "/finance/confirmation").unwrap();
        assert_eq!(graph.flow(), "finance-information");
        assert_eq!(graph.entry(), &StepId::from(steps::CONTACT_INFO));
        assert_eq!(graph.confirmation_path(), "/finance/confirmation");
    }

    fn required_fields(graph: &StepGraph, step: &str) -> Vec<String> {
        graph
            .step(&StepId::from(step))
            .unwrap()
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.clone())
            .collect()
    }

    #[test]
    fn standalone_forms_leave_timeline_optional() {
        let finance = information("finance", "/finance/confirmation").unwrap();
        assert_eq!(required_fields(&finance, "finance-details"), ["investmentSize", "investmentType"]);
        let homeowners = information("homeowners", "/homeowners/confirmation").unwrap();
        assert_eq!(required_fields(&homeowners, "homeowners-details"), ["homeType", "budget"]);

        // The survey keeps asking for it.
        let graph = survey().unwrap();
        assert!(required_fields(&graph, "finance-details").contains(&"timeline".to_string()));
        assert!(required_fields(&graph, "homeowners-details").contains(&"timeline".to_string()));
    }

    #[test]
    fn confirmation_pages_follow_each_form() {
        let catalog = FlowCatalog::standard().unwrap();
        for (flow, page) in [
            ("finance-information", "/finance/confirmation"),
            ("nonprofits-information", "/contact"),
            ("government-information", "/contact"),
            ("developers-information", "/developer-dashboard"),
            (CONTACT_FLOW, "/contact"),
        ] {
            assert_eq!(catalog.get(flow).unwrap().graph().confirmation_path(), page, "{flow}");
        }
    }

    #[test]
    fn contact_form_is_one_step() {
        let graph = contact().unwrap();
        assert_eq!(graph.steps().count(), 1);
        let step = graph.step(graph.entry()).unwrap();
        assert!(step.is_terminal());
        assert_eq!(
            required_fields(&graph, steps::CONTACT),
            ["name", "email", "message", "agreeToContact", "agreeToTerms"]
        );
        assert_eq!(step.find_field("reason").unwrap().options.len(), 7);
        assert_eq!(step.find_field("urgency").unwrap().options.len(), 4);
    }

    /// A value that satisfies `def` as a required field.
    fn filled(def: &FieldDef) -> FieldValue {
        match def.kind {
            FieldKind::SingleSelect => FieldValue::Text(def.options[0].clone()),
            FieldKind::MultiSelect => FieldValue::MultiChoice(vec![def.options[0].clone()]),
            FieldKind::FreeText => FieldValue::Text("x".to_string()),
            FieldKind::Date => FieldValue::Text("2026-01-01".to_string()),
            FieldKind::Boolean => FieldValue::Flag(true),
        }
    }

    /// Check the current step's required fields one by one, then move on to
    /// every possible successor. Returns the number of steps visited.
    fn walk(ctl: &FlowController, session: &FlowSession) -> usize {
        let step = ctl.current_step(session).unwrap().clone();
        let required: Vec<&FieldDef> = step.fields.iter().filter(|f| f.required).collect();

        let mut complete = session.clone();
        for def in &required {
            ctl.set_field(&mut complete, &def.name, filled(def)).unwrap();
        }

        for missing in &required {
            let mut s = complete.clone();
            ctl.set_field(&mut s, &missing.name, FieldValue::empty_for(missing.kind)).unwrap();
            let err = ctl.advance(&s).unwrap_err();
            let expected = if missing.kind == FieldKind::Boolean {
                ValidationError::AgreementNotAccepted(missing.name.clone())
            } else {
                ValidationError::MissingField(missing.name.clone())
            };
            assert!(
                matches!(err, FlowError::Validation(ref e) if *e == expected),
                "{}/{}: {err}",
                ctl.graph().flow(),
                step.id
            );
            assert_eq!(s.current, step.id);
            assert_eq!(s.status, FlowStatus::InProgress);
        }

        match &step.next {
            Next::Submit => {
                let done = ctl.advance(&complete).unwrap();
                assert_eq!(done.current, step.id);
                assert_eq!(done.status, FlowStatus::AwaitingSubmission);
                1
            }
            Next::Step { id } => {
                let next = ctl.advance(&complete).unwrap();
                assert_eq!(&next.current, id);
                1 + walk(ctl, &next)
            }
            Next::Branch { field } => {
                let options = step.find_field(field).unwrap().options.clone();
                let mut visited = 1;
                for option in options {
                    let mut s = complete.clone();
                    ctl.set_field(&mut s, field, FieldValue::Text(option.clone())).unwrap();
                    let next = ctl.advance(&s).unwrap();
                    assert_eq!(next.current, ctl.graph().router().resolve(&option).unwrap());
                    visited += walk(ctl, &next);
                }
                visited
            }
        }
    }

    #[test]
    fn every_step_enforces_its_required_fields() {
        let catalog = FlowCatalog::standard().unwrap();
        for ctl in catalog.flows() {
            let visited = walk(ctl, &ctl.start());
            let expected = match ctl.graph().flow() {
                // general info, then each role step followed by wrap-up
                SURVEY_FLOW => 1 + 2 * ROLES.len(),
                CONTACT_FLOW => 1,
                _ => 3,
            };
            assert_eq!(visited, expected, "{}", ctl.graph().flow());
        }
    }

    #[test]
    fn unknown_role_prefix_is_rejected() {
        assert!(matches!(
            information("pirates", "/"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn duplicate_flow_is_rejected() {
        let mut catalog = FlowCatalog::new();
        catalog.register(survey().unwrap()).unwrap();
        assert!(matches!(
            catalog.register(survey().unwrap()),
            Err(ConfigError::DuplicateFlow(_))
        ));
    }
}
