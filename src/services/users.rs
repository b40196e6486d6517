use crate::error::AppError;
use crate::models::{CreateUserRequest, NewGoal, NewUser, User};
use crate::password::hash_password;
use crate::store::FinanceStore;
use crate::validation::validate_user_request;
use crate::Result;
use tokio::task;
use tracing::{info, warn};

/// Create a user and then each of its goals.
///
/// Goals are inserted one at a time after the user. There is no wrapping
/// transaction, so a failing goal leaves the user with the goals inserted
/// before it.
pub async fn create_user_with_goals(store: &dyn FinanceStore, request: CreateUserRequest) -> Result<User> {
    validate_user_request(&request)?;

    let password = request.password;
    let password_hash = task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Password(format!("Password hashing task failed: {}", e)))??;

    let user = store
        .create_user(NewUser {
            name: request.name,
            age: request.age,
            email: request.email,
            password_hash,
            income: request.income,
            money_saved: request.money_saved,
        })
        .await?;

    let total = request.goals.len();
    for (index, goal) in request.goals.into_iter().enumerate() {
        let new_goal = NewGoal {
            user_id: user.id.clone(),
            goal: goal.goal,
            primary: goal.primary,
            value: goal.value,
            term: goal.term,
            days_term: goal.term.days_term(),
        };

        if let Err(e) = store.create_goal(new_goal).await {
            warn!(
                user_id = %user.id,
                inserted = index,
                total,
                "Goal insert failed; user kept with partial goals: {}",
                e
            );
            return Err(e);
        }
    }

    info!(user_id = %user.id, goals = total, "User onboarded");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Goal, GoalRequest, GoalTerm, NewTransaction, Transaction, UserProfile};
    use crate::store::{DateRange, InMemoryFinanceStore};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Delegates to the in-memory store but rejects the nth goal insert.
    struct FlakyGoalStore {
        inner: InMemoryFinanceStore,
        fail_on_goal: usize,
        goal_calls: AtomicUsize,
        last_user: Mutex<Option<String>>,
    }

    impl FlakyGoalStore {
        fn failing_on(fail_on_goal: usize) -> Self {
            Self {
                inner: InMemoryFinanceStore::new(),
                fail_on_goal,
                goal_calls: AtomicUsize::new(0),
                last_user: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl FinanceStore for FlakyGoalStore {
        async fn create_user(&self, user: NewUser) -> Result<User> {
            let created = self.inner.create_user(user).await?;
            *self.last_user.lock().unwrap() = Some(created.id.clone());
            Ok(created)
        }

        async fn create_goal(&self, goal: NewGoal) -> Result<Goal> {
            let call = self.goal_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on_goal {
                return Err(AppError::Database("connection reset".to_string()));
            }
            self.inner.create_goal(goal).await
        }

        async fn create_transaction(&self, tx: NewTransaction) -> Result<Transaction> {
            self.inner.create_transaction(tx).await
        }

        async fn list_transactions(&self, range: Option<DateRange>) -> Result<Vec<Transaction>> {
            self.inner.list_transactions(range).await
        }

        async fn find_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
            self.inner.find_user_profile(user_id).await
        }

        async fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>> {
            self.inner.list_goals(user_id).await
        }

        async fn transactions_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<Transaction>> {
            self.inner.transactions_since(user_id, since).await
        }
    }

    fn request(goals: Vec<GoalRequest>) -> CreateUserRequest {
        CreateUserRequest {
            name: "Ana".to_string(),
            age: "30".to_string(),
            email: "ana@example.com".to_string(),
            password: "plain-secret".to_string(),
            income: 500000,
            money_saved: 120000,
            goals,
        }
    }

    fn goal(name: &str, primary: bool, term: GoalTerm) -> GoalRequest {
        GoalRequest {
            goal: name.to_string(),
            primary,
            value: Some(1000000),
            term,
        }
    }

    #[tokio::test]
    async fn test_goals_get_owner_and_horizon() {
        let store = InMemoryFinanceStore::new();
        let user = create_user_with_goals(
            &store,
            request(vec![
                goal("car", true, GoalTerm::MediumTerm),
                goal("trip", false, GoalTerm::ShortTerm),
            ]),
        )
        .await
        .unwrap();

        let goals = store.list_goals(&user.id).await.unwrap();
        assert_eq!(goals.len(), 2);
        assert!(goals.iter().all(|g| g.user_id == user.id));
        assert_eq!(goals[0].days_term, 3285);
        assert!(goals[0].primary);
        assert_eq!(goals[1].days_term, 730);
        assert!(!goals[1].primary);
    }

    #[tokio::test]
    async fn test_failed_goal_keeps_user_and_earlier_goals() {
        let store = FlakyGoalStore::failing_on(2);
        let result = create_user_with_goals(
            &store,
            request(vec![
                goal("car", true, GoalTerm::LongTerm),
                goal("trip", false, GoalTerm::ShortTerm),
                goal("home", false, GoalTerm::MediumTerm),
            ]),
        )
        .await;

        assert!(matches!(result, Err(AppError::Database(_))));

        let user_id = store.last_user.lock().unwrap().clone().unwrap();
        assert!(store.inner.find_user(&user_id).await.is_some());

        let goals = store.inner.list_goals(&user_id).await.unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].goal, "car");
        assert_eq!(store.goal_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_password_is_hashed() {
        let store = InMemoryFinanceStore::new();
        let user = create_user_with_goals(&store, request(vec![])).await.unwrap();

        let stored = store.find_user(&user.id).await.unwrap();
        assert_ne!(stored.password_hash, "plain-secret");
        assert!(crate::password::verify_password("plain-secret", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_invalid_email_creates_nothing() {
        let store = InMemoryFinanceStore::new();
        let mut bad = request(vec![goal("car", true, GoalTerm::LongTerm)]);
        bad.email = "ana.example.com".to_string();

        let err = create_user_with_goals(&store, bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref v) if v.field == "email"));
    }
}
