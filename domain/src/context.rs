//! Contextual variables available for link parameter substitution.
//!
//! The host platform reads this data from ambient request state; here it is
//! an explicit context object assembled by the caller and handed to every
//! rendering call.

use std::collections::BTreeMap;

use crate::UrlResource;

/// Context-value provider port: resolve a contextual variable by name.
pub trait ContextValues {
    fn resolve(&self, key: &str) -> Option<String>;
}

impl ContextValues for BTreeMap<String, String> {
    fn resolve(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Site-wide values.
#[derive(Clone, Debug, Default)]
pub struct SiteContext {
    pub name: String,
    /// Site root URL, also used for local-page detection.
    pub server_url: String,
    pub lang: String,
}

/// Values of the course the resource lives in.
#[derive(Clone, Debug, Default)]
pub struct CourseContext {
    pub id: u64,
    pub fullname: String,
    pub shortname: String,
    pub idnumber: String,
    pub summary: String,
    pub format: String,
}

/// Values of the viewing user, present only when someone is logged in.
#[derive(Clone, Debug, Default)]
pub struct UserContext {
    pub id: u64,
    pub username: String,
    pub idnumber: String,
    pub firstname: String,
    pub lastname: String,
    pub fullname: String,
    pub email: String,
}

/// Everything the host can supply for substitution into outgoing URLs.
#[derive(Clone, Debug, Default)]
pub struct RenderContext {
    pub site: SiteContext,
    pub course: CourseContext,
    pub user: Option<UserContext>,
    /// Free-form role-name variables, e.g. "courseteacher" -> localized name.
    pub roles: BTreeMap<String, String>,
    /// Current unix time, exposed as the `currenttime` variable.
    pub now: u64,
}

impl RenderContext {
    /// Flatten the context into the recognized variable catalog for one
    /// resource. Unknown variable names simply stay unresolved.
    pub fn values(&self, resource: &UrlResource) -> BTreeMap<String, String> {
        let mut values = BTreeMap::new();

        values.insert("courseid".into(), self.course.id.to_string());
        values.insert("coursefullname".into(), self.course.fullname.clone());
        values.insert("courseshortname".into(), self.course.shortname.clone());
        values.insert("courseidnumber".into(), self.course.idnumber.clone());
        values.insert("coursesummary".into(), self.course.summary.clone());
        values.insert("courseformat".into(), self.course.format.clone());

        values.insert("resourceinstance".into(), resource.id.to_string());
        values.insert("resourcename".into(), resource.name.clone());

        values.insert("sitename".into(), self.site.name.clone());
        values.insert("serverurl".into(), self.site.server_url.clone());
        values.insert("lang".into(), self.site.lang.clone());
        values.insert("currenttime".into(), self.now.to_string());

        if let Some(user) = &self.user {
            values.insert("userid".into(), user.id.to_string());
            values.insert("userusername".into(), user.username.clone());
            values.insert("useridnumber".into(), user.idnumber.clone());
            values.insert("userfirstname".into(), user.firstname.clone());
            values.insert("userlastname".into(), user.lastname.clone());
            values.insert("userfullname".into(), user.fullname.clone());
            values.insert("useremail".into(), user.email.clone());
        }

        for (role, name) in &self.roles {
            values.insert(format!("course{role}"), name.clone());
        }

        values
    }
}
