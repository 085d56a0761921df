//! Write actions of the two switch projections

use serde::Deserialize;

use super::{Entity, Projection};
use crate::error::AppError;
use crate::models::{Fleet, ImeiLock, SimState};
use crate::simbase::client::SimbaseApi;
use crate::simbase::coordinator::Coordinator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchAction {
    TurnOn,
    TurnOff,
}

impl SwitchAction {
    pub fn is_on(&self) -> bool {
        matches!(self, SwitchAction::TurnOn)
    }
}

impl Entity {
    /// Call the API mutation, then ask the fleet coordinator for a refresh.
    ///
    /// API failures are returned untouched and no refresh is requested.
    pub async fn switch(
        &self,
        action: SwitchAction,
        api: &dyn SimbaseApi,
        fleet: &Coordinator<Fleet>,
    ) -> Result<(), AppError> {
        match &self.projection {
            Projection::StatusSwitch { iccid } => {
                let state = if action.is_on() {
                    SimState::Enabled
                } else {
                    SimState::Disabled
                };
                api.set_sim_state(iccid, state).await?;
            }
            Projection::ImeiLockSwitch { iccid } => {
                let lock = if action.is_on() {
                    ImeiLock::On
                } else {
                    ImeiLock::Off
                };
                api.set_imei_lock(iccid, lock).await?;
            }
            _ => {
                return Err(AppError::BadRequest(format!(
                    "{} is not a switch",
                    self.unique_id
                )));
            }
        }

        fleet.request_refresh().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimbaseError;
    use crate::simbase::coordinator::FetchFn;
    use crate::simbase::testing::{sample_fleet, FakeApi};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    fn coordinator_over(api: Arc<FakeApi>) -> Coordinator<Fleet> {
        let fetch: FetchFn<Fleet> = Arc::new(move || {
            let api = api.clone();
            Box::pin(async move { api.fetch_fleet().await })
        });
        Coordinator::new("simbase_sims", Duration::from_secs(300), fetch)
    }

    #[tokio::test]
    async fn test_turn_off_status_then_refresh() {
        let api = Arc::new(FakeApi::new(sample_fleet()));
        let fleet = coordinator_over(api.clone());
        fleet.first_refresh().await.unwrap();

        let entity = Entity::new(
            Projection::StatusSwitch {
                iccid: "89001".into(),
            },
            &*fleet.current().await,
        );
        entity
            .switch(SwitchAction::TurnOff, &*api, &fleet)
            .await
            .unwrap();

        assert_eq!(api.calls(), vec!["set_sim_state 89001 disabled"]);
        assert_eq!(api.fleet_fetches.load(Ordering::SeqCst), 2);
        assert_eq!(
            fleet.current().await.get("89001").unwrap().state,
            Some(SimState::Disabled)
        );
    }

    #[tokio::test]
    async fn test_imei_lock_on() {
        let api = Arc::new(FakeApi::new(sample_fleet()));
        let fleet = coordinator_over(api.clone());
        fleet.first_refresh().await.unwrap();

        let entity = Entity::new(
            Projection::ImeiLockSwitch {
                iccid: "89001".into(),
            },
            &*fleet.current().await,
        );
        entity
            .switch(SwitchAction::TurnOn, &*api, &fleet)
            .await
            .unwrap();

        assert_eq!(api.calls(), vec!["set_imei_lock 89001 on"]);
        assert_eq!(
            fleet.current().await.get("89001").unwrap().imei_lock,
            Some(ImeiLock::On)
        );
    }

    #[tokio::test]
    async fn test_failure_propagates_without_refresh() {
        let api = Arc::new(FakeApi::new(sample_fleet()));
        let fleet = coordinator_over(api.clone());
        fleet.first_refresh().await.unwrap();
        *api.write_error.lock().unwrap() = Some(SimbaseError::UpstreamError { status: 500 });

        let entity = Entity::new(
            Projection::StatusSwitch {
                iccid: "89001".into(),
            },
            &*fleet.current().await,
        );
        let err = entity
            .switch(SwitchAction::TurnOff, &*api, &fleet)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Upstream(SimbaseError::UpstreamError { status: 500 })
        ));
        assert_eq!(api.fleet_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sensor_is_not_writable() {
        let api = Arc::new(FakeApi::new(sample_fleet()));
        let fleet = coordinator_over(api.clone());

        let entity = Entity::new(
            Projection::LastSms {
                iccid: "89001".into(),
            },
            &sample_fleet(),
        );
        let err = entity
            .switch(SwitchAction::TurnOn, &*api, &fleet)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(api.calls().is_empty());
    }
}
