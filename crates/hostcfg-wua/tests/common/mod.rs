//! In-memory automation backend standing in for the update agent

#![allow(dead_code)]

use std::any::Any;
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hostcfg_wua::automation::{
    Arg, AutomationError, AutomationRuntime, COLLECTION_PROG_ID, Dispatch, SESSION_PROG_ID,
    SYSTEM_INFO_PROG_ID, Variant,
};

pub const DISP_E_EXCEPTION: u32 = 0x8002_0009;
pub const DISP_E_UNKNOWNNAME: u32 = 0x8002_0006;
pub const REGDB_E_CLASSNOTREG: u32 = 0x8004_0154;
pub const CO_E_NOTINITIALIZED: u32 = 0x8004_01f0;
pub const WU_E_NO_CONNECTION: u32 = 0x8024_402c;

/// Update descriptor served by the fake backend
#[derive(Debug, Clone)]
pub struct FakeUpdate {
    pub title: String,
    pub description: String,
    pub support_url: String,
    pub eula_accepted: bool,
    pub kb_article_ids: Vec<String>,
    pub categories: Vec<(String, String)>,
    pub more_info_urls: Vec<String>,
    pub update_id: String,
    pub revision_number: i32,
    pub last_deployment_change_time: f64,
    /// Reading this property (on the update or any of its nested objects) fails
    pub fail_property: Option<&'static str>,
    /// Calling this method on the update fails
    pub fail_method: Option<&'static str>,
}

impl FakeUpdate {
    pub fn new(title: &str, update_id: &str) -> Self {
        Self {
            title: title.to_string(),
            description: format!("{title} description"),
            support_url: "https://support.microsoft.com".to_string(),
            eula_accepted: true,
            kb_article_ids: vec!["5005565".to_string()],
            categories: vec![(
                "Security Updates".to_string(),
                "0fa1201d-4330-4fa8-8ae9-b877473b6441".to_string(),
            )],
            more_info_urls: vec!["https://support.microsoft.com/help/5005565".to_string()],
            update_id: update_id.to_string(),
            revision_number: 200,
            last_deployment_change_time: 45000.25,
            fail_property: None,
            fail_method: None,
        }
    }

    pub fn eula_pending(mut self) -> Self {
        self.eula_accepted = false;
        self
    }

    pub fn with_categories(mut self, categories: &[(&str, &str)]) -> Self {
        self.categories = categories
            .iter()
            .map(|(n, id)| ((*n).to_string(), (*id).to_string()))
            .collect();
        self
    }

    pub fn with_kb_article_ids(mut self, ids: &[&str]) -> Self {
        self.kb_article_ids = ids.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn without_lists(mut self) -> Self {
        self.kb_article_ids.clear();
        self.categories.clear();
        self.more_info_urls.clear();
        self
    }

    pub fn with_deployment_time(mut self, value: f64) -> Self {
        self.last_deployment_change_time = value;
        self
    }

    pub fn failing_on(mut self, property: &'static str) -> Self {
        self.fail_property = Some(property);
        self
    }

    pub fn failing_call(mut self, method: &'static str) -> Self {
        self.fail_method = Some(method);
        self
    }
}

/// Shared state of the fake update agent, with handle and call accounting
#[derive(Default)]
pub struct World {
    updates: Vec<FakeUpdate>,
    eula: Mutex<Vec<bool>>,
    events: Mutex<Vec<String>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    initialized: AtomicUsize,
    uninitialized: AtomicUsize,
    fail_initialize: bool,
    fail_root: bool,
    fail_search: bool,
    fail_download: bool,
    fail_install: bool,
    reboot_required: bool,
}

impl World {
    pub fn with_updates(updates: Vec<FakeUpdate>) -> Self {
        let eula = updates.iter().map(|u| u.eula_accepted).collect();
        Self {
            updates,
            eula: Mutex::new(eula),
            ..Self::default()
        }
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    pub fn failing_root(mut self) -> Self {
        self.fail_root = true;
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub fn failing_download(mut self) -> Self {
        self.fail_download = true;
        self
    }

    pub fn failing_install(mut self) -> Self {
        self.fail_install = true;
        self
    }

    pub fn rebooting(mut self) -> Self {
        self.reboot_required = true;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn runtime(self: &Arc<Self>) -> Arc<dyn AutomationRuntime> {
        Arc::new(FakeRuntime(Arc::clone(self)))
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn live_handles(&self) -> usize {
        self.acquired() - self.released()
    }

    pub fn initialized(&self) -> usize {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn uninitialized(&self) -> usize {
        self.uninitialized.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count_events(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn titles(&self, indices: &[usize]) -> String {
        indices
            .iter()
            .map(|&i| self.updates[i].title.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn exception(scode: u32, description: &str) -> AutomationError {
    AutomationError::new(DISP_E_EXCEPTION, "Exception occurred.").with_exception(scode, description)
}

fn unknown_name(name: &str) -> AutomationError {
    AutomationError::new(DISP_E_UNKNOWNNAME, format!("Unknown name: {name}"))
}

fn index(args: &[Arg<'_>]) -> Result<usize, AutomationError> {
    match args.first() {
        Some(Arg::Int(n)) => usize::try_from(*n)
            .map_err(|_| AutomationError::new(0x8000_0057, "index out of range")),
        _ => Err(AutomationError::new(0x8000_0057, "missing index")),
    }
}

struct FakeRuntime(Arc<World>);

impl AutomationRuntime for FakeRuntime {
    fn initialize(&self) -> Result<(), AutomationError> {
        if self.0.fail_initialize {
            return Err(AutomationError::new(CO_E_NOTINITIALIZED, "CoInitialize has not been called."));
        }
        let active = self.0.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.0.max_active.fetch_max(active, Ordering::SeqCst);
        self.0.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn uninitialize(&self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
        self.0.uninitialized.fetch_add(1, Ordering::SeqCst);
    }

    fn create_object(&self, prog_id: &str) -> Result<Box<dyn Dispatch>, AutomationError> {
        let kind = match prog_id {
            SESSION_PROG_ID if self.0.fail_root => {
                return Err(AutomationError::new(REGDB_E_CLASSNOTREG, "Class not registered"));
            }
            SESSION_PROG_ID => Kind::Root,
            COLLECTION_PROG_ID => Kind::Collection(RefCell::new(Vec::new())),
            SYSTEM_INFO_PROG_ID => Kind::SystemInfo,
            _ => return Err(AutomationError::new(REGDB_E_CLASSNOTREG, "Class not registered")),
        };
        Ok(FakeObject::boxed(&self.0, kind))
    }

    fn runtime_type(&self) -> &'static str {
        "fake"
    }
}

enum Kind {
    Root,
    Searcher,
    SearchResult,
    Collection(RefCell<Vec<usize>>),
    Update(usize),
    Strings(usize, &'static str),
    Categories(usize),
    Category(usize, usize),
    Identity(usize),
    Downloader(RefCell<Option<Vec<usize>>>),
    Installer(RefCell<Option<Vec<usize>>>),
    OperationResult,
    SystemInfo,
}

struct FakeObject {
    world: Arc<World>,
    kind: Kind,
}

impl FakeObject {
    fn boxed(world: &Arc<World>, kind: Kind) -> Box<dyn Dispatch> {
        world.acquired.fetch_add(1, Ordering::SeqCst);
        Box::new(Self {
            world: Arc::clone(world),
            kind,
        })
    }

    fn object(&self, kind: Kind) -> Variant {
        Variant::Object(Self::boxed(&self.world, kind))
    }

    /// Update this object belongs to, if any
    fn owner(&self) -> Option<&FakeUpdate> {
        let i = match self.kind {
            Kind::Update(i)
            | Kind::Strings(i, _)
            | Kind::Categories(i)
            | Kind::Category(i, _)
            | Kind::Identity(i) => i,
            _ => return None,
        };
        self.world.updates.get(i)
    }

    fn strings(&self, i: usize, property: &str) -> &[String] {
        let update = &self.world.updates[i];
        match property {
            "KBArticleIDs" => &update.kb_article_ids,
            _ => &update.more_info_urls,
        }
    }

    fn update_property(&self, i: usize, name: &str) -> Result<Variant, AutomationError> {
        let update = &self.world.updates[i];
        let value = match name {
            "Title" => Variant::String(update.title.clone()),
            "Description" => Variant::String(update.description.clone()),
            "SupportURL" => Variant::String(update.support_url.clone()),
            "EulaAccepted" => Variant::Bool(self.world.eula.lock().unwrap()[i]),
            "KBArticleIDs" => self.object(Kind::Strings(i, "KBArticleIDs")),
            "MoreInfoURLs" => self.object(Kind::Strings(i, "MoreInfoURLs")),
            "Categories" => self.object(Kind::Categories(i)),
            "Identity" => self.object(Kind::Identity(i)),
            "LastDeploymentChangeTime" => Variant::Date(update.last_deployment_change_time),
            _ => return Err(unknown_name(name)),
        };
        Ok(value)
    }

    fn target(arg: Arg<'_>) -> Option<Vec<usize>> {
        match arg {
            Arg::Object(obj) => match &obj.as_any().downcast_ref::<FakeObject>()?.kind {
                Kind::Collection(items) => Some(items.borrow().clone()),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Drop for FakeObject {
    fn drop(&mut self) {
        self.world.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl Dispatch for FakeObject {
    fn get_property(&self, name: &str, args: &[Arg<'_>]) -> Result<Variant, AutomationError> {
        if self.owner().and_then(|u| u.fail_property) == Some(name) {
            return Err(exception(0x8024_0fff, "injected failure"));
        }

        match (&self.kind, name) {
            (Kind::SearchResult, "Updates") => Ok(self.object(Kind::Collection(RefCell::new(
                (0..self.world.updates.len()).collect(),
            )))),
            (Kind::Collection(items), "Count") => Ok(Variant::Int(items.borrow().len() as i64)),
            (Kind::Collection(items), "Item") => {
                let idx = *items
                    .borrow()
                    .get(index(args)?)
                    .ok_or_else(|| AutomationError::new(0x8000_0057, "index out of range"))?;
                Ok(self.object(Kind::Update(idx)))
            }
            (Kind::Update(i), _) => self.update_property(*i, name),
            (Kind::Strings(i, property), "Count") => {
                Ok(Variant::Int(self.strings(*i, property).len() as i64))
            }
            (Kind::Strings(i, property), "Item") => self
                .strings(*i, property)
                .get(index(args)?)
                .map(|s| Variant::String(s.clone()))
                .ok_or_else(|| AutomationError::new(0x8000_0057, "index out of range")),
            (Kind::Categories(i), "Count") => {
                Ok(Variant::Int(self.world.updates[*i].categories.len() as i64))
            }
            (Kind::Categories(i), "Item") => {
                let pos = index(args)?;
                if pos >= self.world.updates[*i].categories.len() {
                    return Err(AutomationError::new(0x8000_0057, "index out of range"));
                }
                Ok(self.object(Kind::Category(*i, pos)))
            }
            (Kind::Category(i, pos), "Name") => {
                Ok(Variant::String(self.world.updates[*i].categories[*pos].0.clone()))
            }
            (Kind::Category(i, pos), "CategoryID") => {
                Ok(Variant::String(self.world.updates[*i].categories[*pos].1.clone()))
            }
            (Kind::Identity(i), "RevisionNumber") => Ok(Variant::Int(i64::from(
                self.world.updates[*i].revision_number,
            ))),
            (Kind::Identity(i), "UpdateID") => {
                Ok(Variant::String(self.world.updates[*i].update_id.clone()))
            }
            (Kind::SystemInfo, "RebootRequired") => Ok(Variant::Bool(self.world.reboot_required)),
            _ => Err(unknown_name(name)),
        }
    }

    fn call_method(&self, name: &str, args: &[Arg<'_>]) -> Result<Variant, AutomationError> {
        if let Kind::Update(i) = self.kind {
            if self.world.updates[i].fail_method == Some(name) {
                return Err(exception(0x8024_0fff, "injected failure"));
            }
        }

        let world = &self.world;
        match (&self.kind, name) {
            (Kind::Root, "CreateUpdateSearcher") => Ok(self.object(Kind::Searcher)),
            (Kind::Root, "CreateUpdateDownloader") => {
                Ok(self.object(Kind::Downloader(RefCell::new(None))))
            }
            (Kind::Root, "CreateUpdateInstaller") => {
                Ok(self.object(Kind::Installer(RefCell::new(None))))
            }
            (Kind::Searcher, "Search") => {
                let query = match args.first() {
                    Some(Arg::Str(q)) => (*q).to_string(),
                    _ => return Err(AutomationError::new(0x8000_0057, "missing query")),
                };
                world.record(format!("search:{query}"));
                if world.fail_search {
                    return Err(exception(WU_E_NO_CONNECTION, "no connection"));
                }
                Ok(self.object(Kind::SearchResult))
            }
            (Kind::Collection(items), "Add") => {
                let added = match args.first() {
                    Some(Arg::Object(obj)) => match obj.as_any().downcast_ref::<FakeObject>() {
                        Some(FakeObject {
                            kind: Kind::Update(i),
                            ..
                        }) => *i,
                        _ => return Err(AutomationError::new(0x8000_0057, "not an update")),
                    },
                    _ => return Err(AutomationError::new(0x8000_0057, "missing update")),
                };
                items.borrow_mut().push(added);
                Ok(Variant::Int(items.borrow().len() as i64 - 1))
            }
            (Kind::Collection(items), "RemoveAt") => {
                let pos = index(args)?;
                if pos >= items.borrow().len() {
                    return Err(AutomationError::new(0x8000_0057, "index out of range"));
                }
                items.borrow_mut().remove(pos);
                Ok(Variant::Empty)
            }
            (Kind::Update(i), "AcceptEula") => {
                world.record(format!("accept_eula:{}", world.updates[*i].title));
                world.eula.lock().unwrap()[*i] = true;
                Ok(Variant::Empty)
            }
            (Kind::Downloader(target), "Download") => {
                let Some(indices) = target.borrow().clone() else {
                    return Err(exception(0x8024_0024, "no updates to download"));
                };
                world.record(format!("download:{}", world.titles(&indices)));
                if world.fail_download {
                    return Err(exception(WU_E_NO_CONNECTION, "download failed"));
                }
                Ok(self.object(Kind::OperationResult))
            }
            (Kind::Installer(target), "Install") => {
                let Some(indices) = target.borrow().clone() else {
                    return Err(exception(0x8024_0024, "no updates to install"));
                };
                world.record(format!("install:{}", world.titles(&indices)));
                if world.fail_install {
                    return Err(exception(0x8024_0022, "install failed"));
                }
                Ok(self.object(Kind::OperationResult))
            }
            _ => Err(unknown_name(name)),
        }
    }

    fn put_property(&self, name: &str, value: Arg<'_>) -> Result<(), AutomationError> {
        match (&self.kind, name) {
            (Kind::Downloader(target) | Kind::Installer(target), "Updates") => {
                let indices = Self::target(value)
                    .ok_or_else(|| AutomationError::new(0x8000_0057, "not a collection"))?;
                *target.borrow_mut() = Some(indices);
                Ok(())
            }
            _ => Err(unknown_name(name)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
