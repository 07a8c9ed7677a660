//! The waste knowledge base.
//!
//! A static built-in table of common household waste covers the everyday
//! cases; a persistent user list extends it at runtime. Lookups scan the
//! built-in records first, so a user record never shadows a built-in one
//! on equal score.

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::models::{WasteCategory, WasteRecord};
use crate::storage::KeyValueStorage;

/// Storage slot holding the serialized user list.
pub const STORAGE_KEY: &str = "recyklacni_asistent_user_db";

#[rustfmt::skip]
const BUILT_IN: [(&str, WasteCategory, &str); 50] = [
    // žlutá
    ("PET láhev", WasteCategory::Plast, "Sešlápněte, víčko můžete nechat. Patří do žlutého kontejneru."),
    ("Kelímek od jogurtu", WasteCategory::Plast, "Stačí vyškrábnout, vymývat není nutné. Hliníkové víčko patří do kovů."),
    ("Igelitová taška", WasteCategory::Plast, "Čistá taška patří do žlutého kontejneru."),
    ("Plastový sáček", WasteCategory::Plast, "Do žlutého kontejneru, pokud není mastný."),
    ("Polystyren", WasteCategory::Plast, "Menší kusy do žlutého kontejneru, velké desky na sběrný dvůr."),
    ("Nápojový karton", WasteCategory::Plast, "Vypláchněte a sešlápněte. V některých obcích má vlastní oranžový kontejner."),
    ("Karton od mléka", WasteCategory::Plast, "Vypláchnutý nápojový karton patří do žlutého kontejneru."),
    ("Plastová folie", WasteCategory::Plast, "Čistou folii do žlutého kontejneru."),
    // modrá
    ("Noviny", WasteCategory::Papir, "Suché a čisté do modrého kontejneru."),
    ("Časopis", WasteCategory::Papir, "Lesklý papír nevadí, patří do modrého kontejneru."),
    ("Papírová krabice", WasteCategory::Papir, "Rozložte naplocho, ať zabírá méně místa."),
    ("Kancelářský papír", WasteCategory::Papir, "Sponky nevadí, třídicí linka si s nimi poradí."),
    ("Sešit", WasteCategory::Papir, "Do modrého kontejneru i s kovovou vazbou."),
    ("Obálka", WasteCategory::Papir, "Obálky s fóliovým okénkem klidně do modrého kontejneru."),
    // zelená a bílá
    ("Sklenice", WasteCategory::Sklo, "Prázdnou sklenici do zeleného kontejneru, čiré sklo do bílého."),
    ("Skleněná láhev", WasteCategory::Sklo, "Barevné sklo do zeleného, čiré do bílého kontejneru."),
    ("Zavařovací sklenice", WasteCategory::Sklo, "Bez kovového víčka, to patří do kovů."),
    ("Střepy", WasteCategory::Sklo, "Tabulové i obalové sklo patří do kontejneru na sklo."),
    // hnědá
    ("Slupky od banánu", WasteCategory::Bio, "Do hnědé popelnice nebo na kompost."),
    ("Zbytky zeleniny", WasteCategory::Bio, "Patří do hnědé popelnice na bioodpad."),
    ("Kávová sedlina", WasteCategory::Bio, "Výborná i na kompost."),
    ("Posekaná tráva", WasteCategory::Bio, "Do hnědé popelnice nebo na sběrný dvůr."),
    ("Spadané listí", WasteCategory::Bio, "Do hnědé popelnice na bioodpad."),
    // černá popelnice
    ("Použité plenky", WasteCategory::Smesny, "Patří do černé popelnice na směsný odpad."),
    ("Zubní kartáček", WasteCategory::Smesny, "Běžný plastový kartáček patří do směsného odpadu."),
    ("Porcelánový hrnek", WasteCategory::Smesny, "Porcelán do skla nepatří, vhoďte do směsného odpadu."),
    ("Žvýkačka", WasteCategory::Smesny, "Do směsného odpadu."),
    ("Sáček z vysavače", WasteCategory::Smesny, "Do černé popelnice."),
    ("Mastný papír", WasteCategory::Smesny, "Znečištěný papír do modrého kontejneru nepatří."),
    // sběrný dvůr
    ("Televize", WasteCategory::SbernyDvur, "Elektro odevzdejte na sběrném dvoře nebo v místě zpětného odběru."),
    ("Lednička", WasteCategory::SbernyDvur, "Velké elektro patří na sběrný dvůr, odvoz často zajistí prodejce."),
    ("Monitor", WasteCategory::SbernyDvur, "Elektroodpad, odevzdejte na sběrném dvoře."),
    ("Baterie", WasteCategory::SbernyDvur, "Odevzdejte do červených boxů na elektro nebo na sběrný dvůr."),
    ("Zářivka", WasteCategory::SbernyDvur, "Obsahuje rtuť, patří do zpětného odběru nebo na sběrný dvůr."),
    ("Plechovka od barvy", WasteCategory::SbernyDvur, "Zbytky barev jsou nebezpečný odpad, patří na sběrný dvůr."),
    ("Pneumatika", WasteCategory::SbernyDvur, "Zdarma ji vezme pneuservis v rámci zpětného odběru."),
    ("Stavební suť", WasteCategory::SbernyDvur, "Menší množství vezme sběrný dvůr, na větší objednejte kontejner."),
    ("Mobilní telefon", WasteCategory::SbernyDvur, "Funkční přístroj zkuste darovat, jinak zpětný odběr elektra."),
    // šedá
    ("Plechovka", WasteCategory::Kovy, "Vypláchnutou plechovku do šedého kontejneru na kovy."),
    ("Konzerva", WasteCategory::Kovy, "Vypláchněte a vhoďte do kontejneru na kovy."),
    ("Plechovka od piva", WasteCategory::Kovy, "Sešlápněte a vhoďte do šedého kontejneru."),
    ("Alobal", WasteCategory::Kovy, "Čistý alobal do kovů, mastný do směsného odpadu."),
    ("Víčko od piva", WasteCategory::Kovy, "Drobné kovy patří do šedého kontejneru."),
    // jedlé oleje
    ("Fritovací olej", WasteCategory::Oleje, "Vychladlý olej slijte do PET láhve a odevzdejte do kontejneru na oleje."),
    ("Olej z pánve", WasteCategory::Oleje, "Nepatří do výlevky, slijte do láhve a odevzdejte."),
    // textil
    ("Staré oblečení", WasteCategory::Textil, "Čisté a suché do kontejneru na textil."),
    ("Povlečení", WasteCategory::Textil, "Do kontejneru na textil, zabalené v tašce."),
    ("Boty", WasteCategory::Textil, "Svázané v páru do kontejneru na textil."),
    // lékárna
    ("Prošlé léky", WasteCategory::Lekarna, "Odevzdejte v lékárně, do koše ani záchodu nepatří."),
    ("Rtuťový teploměr", WasteCategory::Lekarna, "Nebezpečný odpad, odevzdejte v lékárně."),
];

static BUILT_IN_RECORDS: Lazy<Vec<WasteRecord>> = Lazy::new(|| {
    BUILT_IN
        .iter()
        .map(|&(name, category, note)| WasteRecord::new(name, category, note))
        .collect()
});

/// The static table every installation ships with.
pub fn built_in_records() -> &'static [WasteRecord] {
    &BUILT_IN_RECORDS
}

/// Built-in table plus the user's own records.
pub struct KnowledgeBase<S> {
    storage: S,
    user: Vec<WasteRecord>,
}

impl<S: KeyValueStorage> KnowledgeBase<S> {
    /// Loads the user list from storage. A missing or unreadable slot
    /// starts empty.
    pub fn new(storage: S) -> Self {
        let user = match storage.get_string(STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<WasteRecord>>(&raw) {
                Ok(records) => records,
                Err(err) => {
                    warn!(error = %err, "discarding unreadable user record list");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "failed to read user record list");
                Vec::new()
            }
        };
        Self { storage, user }
    }

    /// Built-in records followed by user records, freshly cloned for one
    /// resolution pass.
    pub fn records(&self) -> Vec<WasteRecord> {
        built_in_records().iter().cloned().chain(self.user.iter().cloned()).collect()
    }

    /// Prepends a record to the user list unless either list already has
    /// that name. Returns whether anything was inserted.
    pub fn insert(&mut self, record: WasteRecord) -> bool {
        if self.contains_name(&record.name) {
            debug!(name = %record.name, "knowledge base already has this name");
            return false;
        }
        self.user.insert(0, record);
        self.persist();
        true
    }

    /// Case-insensitive name lookup across both lists. Folds case only;
    /// "láhev" and "lahev" stay distinct.
    pub fn contains_name(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        built_in_records()
            .iter()
            .chain(self.user.iter())
            .any(|record| record.name.to_lowercase() == lowered)
    }

    /// Whether a record of this exact name came from the user list.
    pub fn is_user_record(&self, name: &str) -> bool {
        self.user.iter().any(|record| record.name == name)
    }

    pub fn user_records(&self) -> &[WasteRecord] {
        &self.user
    }

    fn persist(&mut self) {
        let json = match serde_json::to_string(&self.user) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "failed to serialize user record list");
                return;
            }
        };
        if let Err(err) = self.storage.set_string(STORAGE_KEY, &json) {
            warn!(error = %err, "failed to persist user record list");
        }
    }
}
