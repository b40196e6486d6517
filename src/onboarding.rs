//! Client-side onboarding flow
//!
//! Three linear steps collect a profile, a set of goals and a final review.
//! The flow only ever moves one step at a time, and leaving a step requires
//! its gate to pass. Submission turns the typed form into a
//! [`CreateUserRequest`].

use crate::error::AppError;
use crate::models::{CreateUserRequest, GoalRequest, GoalTerm};
use crate::money::parse_currency_to_cents;
use crate::password::generate_throwaway_password;
use crate::validation::is_valid_email;
use crate::Result;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    Profile,
    Goals,
    Review,
}

impl OnboardingStep {
    pub fn number(self) -> usize {
        match self {
            OnboardingStep::Profile => 1,
            OnboardingStep::Goals => 2,
            OnboardingStep::Review => 3,
        }
    }

    /// Share of the flow already completed, 0..=100.
    pub fn progress_percent(self) -> u8 {
        match self {
            OnboardingStep::Profile => 0,
            OnboardingStep::Goals => 50,
            OnboardingStep::Review => 100,
        }
    }
}

/// Fixed catalog of goals offered during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoalKey {
    Home,
    Car,
    Trip,
    EmergencyFund,
    Other,
}

impl GoalKey {
    pub const CATALOG: [GoalKey; 5] = [
        GoalKey::Home,
        GoalKey::Car,
        GoalKey::Trip,
        GoalKey::EmergencyFund,
        GoalKey::Other,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            GoalKey::Home => "home",
            GoalKey::Car => "car",
            GoalKey::Trip => "trip",
            GoalKey::EmergencyFund => "emergency-fund",
            GoalKey::Other => "other",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            GoalKey::Home => "Casa",
            GoalKey::Car => "Carro",
            GoalKey::Trip => "Viagem",
            GoalKey::EmergencyFund => "Reserva de emergência",
            GoalKey::Other => "Outros",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::CATALOG.into_iter().find(|k| k.slug() == raw.trim())
    }
}

impl fmt::Display for GoalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

/// Horizon vocabulary shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiTerm {
    Short,
    Medium,
    Long,
}

impl UiTerm {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "short" | "curto" => Some(UiTerm::Short),
            "medium" | "medio" | "médio" => Some(UiTerm::Medium),
            "long" | "longo" => Some(UiTerm::Long),
            _ => None,
        }
    }

    pub fn to_goal_term(self) -> GoalTerm {
        match self {
            UiTerm::Short => GoalTerm::ShortTerm,
            UiTerm::Medium => GoalTerm::MediumTerm,
            UiTerm::Long => GoalTerm::LongTerm,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
    pub age: String,
    /// Typed amount, e.g. `"5.000,00"`.
    pub income: String,
    pub money_saved: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalSelection {
    pub key: GoalKey,
    pub custom_label: Option<String>,
    /// Typed target amount; blank means no target.
    pub value: String,
    pub term: Option<UiTerm>,
}

impl GoalSelection {
    fn new(key: GoalKey) -> Self {
        Self {
            key,
            custom_label: None,
            value: String::new(),
            term: None,
        }
    }

    fn custom_label(&self) -> Option<&str> {
        self.custom_label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    /// Custom label when given, otherwise the catalog slug.
    pub fn label(&self) -> String {
        self.custom_label()
            .map(str::to_string)
            .unwrap_or_else(|| self.key.slug().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct OnboardingFlow {
    step: OnboardingStep,
    pub profile: ProfileForm,
    goals: Vec<GoalSelection>,
}

impl Default for OnboardingFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl OnboardingFlow {
    pub fn new() -> Self {
        Self {
            step: OnboardingStep::Profile,
            profile: ProfileForm::default(),
            goals: Vec::new(),
        }
    }

    pub fn step(&self) -> OnboardingStep {
        self.step
    }

    pub fn selected_goals(&self) -> &[GoalSelection] {
        &self.goals
    }

    pub fn is_selected(&self, key: GoalKey) -> bool {
        self.goals.iter().any(|g| g.key == key)
    }

    /// Select or deselect a catalog goal; returns whether it is now selected.
    pub fn toggle_goal(&mut self, key: GoalKey) -> bool {
        if let Some(index) = self.goals.iter().position(|g| g.key == key) {
            self.goals.remove(index);
            false
        } else {
            self.goals.push(GoalSelection::new(key));
            true
        }
    }

    pub fn goal_mut(&mut self, key: GoalKey) -> Option<&mut GoalSelection> {
        self.goals.iter_mut().find(|g| g.key == key)
    }

    pub fn validate_profile(&self) -> Result<()> {
        let profile = &self.profile;

        if profile.name.trim().is_empty() {
            return Err(AppError::Onboarding("Name is required".to_string()));
        }
        if !is_valid_email(&profile.email) {
            return Err(AppError::Onboarding("Enter a valid email address".to_string()));
        }
        if digits_only(&profile.age).is_empty() {
            return Err(AppError::Onboarding("Age is required".to_string()));
        }
        if profile.income.trim().is_empty() {
            return Err(AppError::Onboarding("Income is required".to_string()));
        }
        if parse_currency_to_cents(Some(&profile.income)).is_none() {
            return Err(AppError::Onboarding(format!(
                "Could not read income '{}'",
                profile.income.trim()
            )));
        }
        if !profile.money_saved.trim().is_empty()
            && parse_currency_to_cents(Some(&profile.money_saved)).is_none()
        {
            return Err(AppError::Onboarding(format!(
                "Could not read money saved '{}'",
                profile.money_saved.trim()
            )));
        }
        Ok(())
    }

    pub fn validate_goals(&self) -> Result<()> {
        for goal in &self.goals {
            if goal.key == GoalKey::Other && goal.custom_label().is_none() {
                return Err(AppError::Onboarding(
                    "Give your 'other' goal a name".to_string(),
                ));
            }
            if !goal.value.trim().is_empty() && parse_currency_to_cents(Some(&goal.value)).is_none() {
                return Err(AppError::Onboarding(format!(
                    "Could not read the target value for '{}'",
                    goal.label()
                )));
            }
        }
        Ok(())
    }

    /// Advance one step if the current step's gate passes.
    pub fn next(&mut self) -> Result<OnboardingStep> {
        self.step = match self.step {
            OnboardingStep::Profile => {
                self.validate_profile()?;
                OnboardingStep::Goals
            }
            OnboardingStep::Goals => {
                self.validate_goals()?;
                OnboardingStep::Review
            }
            OnboardingStep::Review => {
                return Err(AppError::Onboarding(
                    "Review is the last step; submit instead".to_string(),
                ))
            }
        };
        Ok(self.step)
    }

    /// Return to the immediate predecessor; the first step stays put.
    pub fn back(&mut self) -> OnboardingStep {
        self.step = match self.step {
            OnboardingStep::Profile | OnboardingStep::Goals => OnboardingStep::Profile,
            OnboardingStep::Review => OnboardingStep::Goals,
        };
        self.step
    }

    /// Compose the user creation payload. Only valid from the review step.
    pub fn build_request(&self) -> Result<CreateUserRequest> {
        if self.step != OnboardingStep::Review {
            return Err(AppError::Onboarding(
                "Finish the previous steps before submitting".to_string(),
            ));
        }
        self.validate_profile()?;
        self.validate_goals()?;

        let income = parse_currency_to_cents(Some(&self.profile.income))
            .ok_or_else(|| AppError::Onboarding("Income is required".to_string()))?;
        let money_saved = parse_currency_to_cents(Some(&self.profile.money_saved)).unwrap_or(0);

        let goals = self
            .goals
            .iter()
            .enumerate()
            .map(|(index, goal)| GoalRequest {
                goal: goal.label(),
                primary: index == 0,
                value: parse_currency_to_cents(Some(&goal.value)),
                term: goal.term.map_or(GoalTerm::ShortTerm, UiTerm::to_goal_term),
            })
            .collect();

        Ok(CreateUserRequest {
            name: self.profile.name.trim().to_string(),
            age: digits_only(&self.profile.age),
            email: self.profile.email.trim().to_string(),
            password: generate_throwaway_password(),
            income,
            money_saved,
            goals,
        })
    }
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}
