//! Application service orchestrating the add/update/delete lifecycle and the
//! render-time view decision.

use std::collections::BTreeMap;

use crate::display::final_display_type;
use crate::mime::MimeGuesser;
use crate::validate::{appears_valid_url, fix_submitted_url};
use crate::{
    unix_secs, Clock, CoreError, DisplayMode, DisplayOptions, NewResource, ResourceRepository,
    UrlResource,
};

/// What the view page should do for a resource at a given time.
///
/// All render-time failures degrade to a notice instead of an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewPlan {
    /// Legacy record with an empty or bare `http://` stored URL.
    InvalidStored,
    /// Outside the visibility window.
    Closed,
    /// Render with the resolved display mode.
    Display(DisplayMode),
}

/// Decide what to show for `resource` at `now`.
pub fn view_plan<M: MimeGuesser + ?Sized>(
    resource: &UrlResource,
    site_root: &str,
    mime: &M,
    now: u64,
) -> ViewPlan {
    // some older sites may contain empty links
    let stored = resource.external_url.trim();
    if stored.is_empty() || stored == "http://" {
        return ViewPlan::InvalidStored;
    }
    if !resource.is_open(now) {
        return ViewPlan::Closed;
    }
    ViewPlan::Display(final_display_type(resource, site_root, mime))
}

/// Service over the repository and clock ports. Stateless apart from the
/// injected collaborators, so each call is independent.
pub struct ResourceService<R: ResourceRepository, C: Clock> {
    repo: R,
    clock: C,
}

impl<R: ResourceRepository, C: Clock> ResourceService<R, C> {
    pub fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Create a new URL resource from submitted form data.
    ///
    /// Validation failures surface as [`CoreError::InvalidUrl`] and nothing
    /// is persisted.
    pub fn add_instance(&self, input: NewResource) -> Result<UrlResource, CoreError> {
        let mut resource = self.normalize(input)?;
        resource.id = self.repo.insert(resource.clone())?;
        Ok(resource)
    }

    /// Update an existing resource in place from submitted form data.
    pub fn update_instance(&self, id: u64, input: NewResource) -> Result<UrlResource, CoreError> {
        if self.repo.get(id)?.is_none() {
            return Err(CoreError::NotFound);
        }
        let mut resource = self.normalize(input)?;
        resource.id = id;
        self.repo.update(&resource)?;
        Ok(resource)
    }

    pub fn delete_instance(&self, id: u64) -> Result<(), CoreError> {
        if self.repo.get(id)?.is_none() {
            return Err(CoreError::NotFound);
        }
        self.repo.delete(id)
    }

    pub fn get(&self, id: u64) -> Result<Option<UrlResource>, CoreError> {
        self.repo.get(id)
    }

    pub fn list_by_course(&self, course: u64) -> Result<Vec<UrlResource>, CoreError> {
        self.repo.list_by_course(course)
    }

    /// Apply the submission rules shared by add and update: repair and
    /// validate the URL, keep only the display options meaningful for the
    /// chosen mode, drop incomplete parameter rows, clear the time window
    /// unless restriction was requested.
    fn normalize(&self, input: NewResource) -> Result<UrlResource, CoreError> {
        if input.external_url.trim().is_empty() {
            return Err(CoreError::InvalidUrl("empty".into()));
        }
        let external_url = fix_submitted_url(&input.external_url);
        if !appears_valid_url(&external_url) {
            return Err(CoreError::InvalidUrl(external_url));
        }

        let mut display_options = DisplayOptions::default();
        if input.display == DisplayMode::Popup {
            display_options.popup_width = input.popup_width;
            display_options.popup_height = input.popup_height;
        }
        if matches!(
            input.display,
            DisplayMode::Auto | DisplayMode::Embed | DisplayMode::Frame
        ) {
            display_options.print_heading = input.print_heading;
            display_options.print_intro = input.print_intro;
        }

        let parameters: BTreeMap<String, String> = input
            .parameters
            .into_iter()
            .filter(|(name, variable)| !name.is_empty() && !variable.is_empty())
            .collect();

        let (time_open, time_close) = if input.time_restrict {
            (input.time_open, input.time_close)
        } else {
            (0, 0)
        };

        Ok(UrlResource {
            id: 0,
            course: input.course,
            name: input.name,
            intro: input.intro,
            external_url,
            display: input.display,
            display_options,
            parameters,
            time_open,
            time_close,
            time_modified: unix_secs(self.clock.now()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_repo::InMemoryRepo;
    use crate::mime::ExtensionMimeGuesser;
    use std::time::{Duration, SystemTime};

    struct TestClock;
    impl Clock for TestClock {
        fn now(&self) -> SystemTime {
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_000)
        }
    }

    fn svc() -> ResourceService<InMemoryRepo, TestClock> {
        ResourceService::new(InMemoryRepo::new(), TestClock)
    }

    fn input(url: &str) -> NewResource {
        NewResource {
            course: 2,
            name: "r".into(),
            external_url: url.into(),
            ..Default::default()
        }
    }

    #[test]
    fn add_repairs_and_persists() {
        let svc = svc();
        let created = svc.add_instance(input("  example.com  ")).expect("created");
        assert_eq!(created.external_url, "http://example.com");
        assert_eq!(created.time_modified, 1_000);
        let stored = svc.get(created.id).unwrap().expect("stored");
        assert_eq!(stored, created);
    }

    #[test]
    fn add_rejects_empty_and_malformed() {
        let svc = svc();
        assert!(matches!(
            svc.add_instance(input("   ")),
            Err(CoreError::InvalidUrl(_))
        ));
        assert!(matches!(
            svc.add_instance(input("http://www.exa mple.com")),
            Err(CoreError::InvalidUrl(_))
        ));
        assert!(svc.list_by_course(2).unwrap().is_empty());
    }

    #[test]
    fn popup_options_only_kept_for_popup() {
        let svc = svc();
        let mut data = input("http://example.com");
        data.popup_width = Some(800);
        data.popup_height = Some(600);
        data.print_heading = true;

        let auto = svc.add_instance(data.clone()).unwrap();
        assert_eq!(auto.display_options.popup_width, None);
        assert!(auto.display_options.print_heading);

        data.display = DisplayMode::Popup;
        let popup = svc.add_instance(data).unwrap();
        assert_eq!(popup.display_options.popup_geometry(), (800, 600));
        // heading/intro flags are not meaningful for popups
        assert!(!popup.display_options.print_heading);
    }

    #[test]
    fn incomplete_parameter_rows_are_dropped() {
        let svc = svc();
        let mut data = input("http://example.com");
        data.parameters = vec![
            ("u".into(), "userid".into()),
            ("".into(), "courseid".into()),
            ("c".into(), "".into()),
        ];
        let created = svc.add_instance(data).unwrap();
        assert_eq!(created.parameters.len(), 1);
        assert_eq!(created.parameters.get("u").map(String::as_str), Some("userid"));
    }

    #[test]
    fn unrestricted_window_is_cleared() {
        let svc = svc();
        let mut data = input("http://example.com");
        data.time_open = 100;
        data.time_close = 200;
        let created = svc.add_instance(data.clone()).unwrap();
        assert_eq!((created.time_open, created.time_close), (0, 0));

        data.time_restrict = true;
        let restricted = svc.add_instance(data).unwrap();
        assert_eq!((restricted.time_open, restricted.time_close), (100, 200));
    }

    #[test]
    fn update_replaces_record() {
        let svc = svc();
        let created = svc.add_instance(input("http://example.com")).unwrap();
        let updated = svc
            .update_instance(created.id, input("https://example.org/x"))
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.external_url, "https://example.org/x");
        let stored = svc.get(created.id).unwrap().expect("stored");
        assert_eq!(stored.external_url, "https://example.org/x");
    }

    #[test]
    fn update_and_delete_missing_are_not_found() {
        let svc = svc();
        assert!(matches!(
            svc.update_instance(99, input("http://example.com")),
            Err(CoreError::NotFound)
        ));
        assert!(matches!(svc.delete_instance(99), Err(CoreError::NotFound)));
    }

    #[test]
    fn delete_removes_record() {
        let svc = svc();
        let created = svc.add_instance(input("http://example.com")).unwrap();
        svc.delete_instance(created.id).unwrap();
        assert!(svc.get(created.id).unwrap().is_none());
    }

    #[test]
    fn view_plan_notices() {
        let svc = svc();
        let mut created = svc.add_instance(input("http://example.com/a.pdf")).unwrap();

        let plan = view_plan(&created, "http://school", &ExtensionMimeGuesser, 500);
        assert_eq!(plan, ViewPlan::Display(DisplayMode::Download));

        created.time_open = 100;
        created.time_close = 200;
        let plan = view_plan(&created, "http://school", &ExtensionMimeGuesser, 500);
        assert_eq!(plan, ViewPlan::Closed);

        created.external_url = "http://".into();
        let plan = view_plan(&created, "http://school", &ExtensionMimeGuesser, 150);
        assert_eq!(plan, ViewPlan::InvalidStored);
    }
}
