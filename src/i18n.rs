use serde::Deserialize;

use crate::interval::Repeat;

/// Language of the static page text. Chosen once from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    De,
    Fr,
    En,
}

impl Locale {
    /// Map a language tag such as `fr-CH` to a locale. German and French
    /// are matched by their primary subtag, everything else is English.
    pub fn from_tag(tag: &str) -> Locale {
        let primary = tag
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        match primary.as_str() {
            "de" => Locale::De,
            "fr" => Locale::Fr,
            _ => Locale::En,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Locale::De => "de",
            Locale::Fr => "fr",
            Locale::En => "en",
        }
    }

    pub fn text(self, key: TextKey) -> &'static str {
        match self {
            Locale::De => german(key),
            Locale::Fr => french(key),
            Locale::En => english(key),
        }
    }

    /// Translate a markup key such as `pwdreq`. Unknown keys give `None`
    /// and the element keeps its own text.
    pub fn translate(self, key: &str) -> Option<&'static str> {
        TextKey::from_key(key).map(|k| self.text(k))
    }

    pub fn repeat_label(self, repeat: &Repeat) -> String {
        match TextKey::for_repeat(repeat) {
            Some(key) => self.text(key).to_string(),
            None => repeat.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKey {
    // login page
    Username,
    Password,
    PasswordForgotten,
    Wait,
    DoLogin,
    // task page
    Tasks,
    NewTask,
    Name,
    Description,
    Owner,
    DueDate,
    LastChanged,
    Interval,
    Divisor,
    StartDates,
    AddDate,
    NextDates,
    Save,
    Remove,
    History,
    Attachments,
    Upload,
    UrlName,
    Url,
    SaveUrl,
    Logout,
    NoTasks,
    Overdue,
    Later,
    Saved,
    Removed,
    NotFound,
    // interval kinds
    Single,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl TextKey {
    pub fn from_key(key: &str) -> Option<TextKey> {
        let key = match key {
            "username" => TextKey::Username,
            "password" => TextKey::Password,
            "pwdreq" => TextKey::PasswordForgotten,
            "wait" => TextKey::Wait,
            "dologin" => TextKey::DoLogin,
            "tasks" => TextKey::Tasks,
            "newtask" => TextKey::NewTask,
            "name" => TextKey::Name,
            "description" => TextKey::Description,
            "owner" => TextKey::Owner,
            "duedate" => TextKey::DueDate,
            "lastchanged" => TextKey::LastChanged,
            "interval" => TextKey::Interval,
            "divider" => TextKey::Divisor,
            "startdates" => TextKey::StartDates,
            "adddate" => TextKey::AddDate,
            "save" => TextKey::Save,
            "remove" => TextKey::Remove,
            "history" => TextKey::History,
            "attachments" => TextKey::Attachments,
            "upload" => TextKey::Upload,
            "logout" => TextKey::Logout,
            _ => return None,
        };
        Some(key)
    }

    pub fn for_repeat(repeat: &Repeat) -> Option<TextKey> {
        match repeat {
            Repeat::Single => Some(TextKey::Single),
            Repeat::Daily => Some(TextKey::Daily),
            Repeat::Weekly => Some(TextKey::Weekly),
            Repeat::Monthly => Some(TextKey::Monthly),
            Repeat::Yearly => Some(TextKey::Yearly),
            Repeat::Other(_) => None,
        }
    }
}

fn german(key: TextKey) -> &'static str {
    match key {
        TextKey::Username => "Benutzername",
        TextKey::Password => "Passwort",
        TextKey::PasswordForgotten => "Passwort vergessen?",
        TextKey::Wait => "Warte auf Antwort vom Server...",
        TextKey::DoLogin => "Anmelden",
        TextKey::Tasks => "Aufgaben",
        TextKey::NewTask => "Neue Aufgabe",
        TextKey::Name => "Name",
        TextKey::Description => "Beschreibung",
        TextKey::Owner => "Verantwortlich",
        TextKey::DueDate => "Fällig am",
        TextKey::LastChanged => "Zuletzt geändert",
        TextKey::Interval => "Wiederholung",
        TextKey::Divisor => "Teiler",
        TextKey::StartDates => "Startdaten",
        TextKey::AddDate => "Datum hinzufügen",
        TextKey::NextDates => "Nächste Termine",
        TextKey::Save => "Speichern",
        TextKey::Remove => "Löschen",
        TextKey::History => "Verlauf",
        TextKey::Attachments => "Anhänge",
        TextKey::Upload => "Hochladen",
        TextKey::UrlName => "Bezeichnung",
        TextKey::Url => "Adresse",
        TextKey::SaveUrl => "Link speichern",
        TextKey::Logout => "Abmelden",
        TextKey::NoTasks => "Keine Aufgaben vorhanden.",
        TextKey::Overdue => "Überfällig",
        TextKey::Later => "Später",
        TextKey::Saved => "Gespeichert.",
        TextKey::Removed => "Gelöscht.",
        TextKey::NotFound => "Aufgabe nicht gefunden.",
        TextKey::Single => "einmalig",
        TextKey::Daily => "täglich",
        TextKey::Weekly => "wöchentlich",
        TextKey::Monthly => "monatlich",
        TextKey::Yearly => "jährlich",
    }
}

fn french(key: TextKey) -> &'static str {
    match key {
        TextKey::Username => "Nom d'utilisateur",
        TextKey::Password => "Mot de passe",
        TextKey::PasswordForgotten => "Mot de passe oublié ?",
        TextKey::Wait => "En attente de réponse du serveur...",
        TextKey::DoLogin => "Registre",
        TextKey::Tasks => "Tâches",
        TextKey::NewTask => "Nouvelle tâche",
        TextKey::Name => "Nom",
        TextKey::Description => "Description",
        TextKey::Owner => "Responsable",
        TextKey::DueDate => "Échéance",
        TextKey::LastChanged => "Dernière modification",
        TextKey::Interval => "Répétition",
        TextKey::Divisor => "Diviseur",
        TextKey::StartDates => "Dates de début",
        TextKey::AddDate => "Ajouter une date",
        TextKey::NextDates => "Prochaines dates",
        TextKey::Save => "Enregistrer",
        TextKey::Remove => "Supprimer",
        TextKey::History => "Historique",
        TextKey::Attachments => "Pièces jointes",
        TextKey::Upload => "Téléverser",
        TextKey::UrlName => "Libellé",
        TextKey::Url => "Adresse",
        TextKey::SaveUrl => "Enregistrer le lien",
        TextKey::Logout => "Déconnexion",
        TextKey::NoTasks => "Aucune tâche.",
        TextKey::Overdue => "En retard",
        TextKey::Later => "Plus tard",
        TextKey::Saved => "Enregistré.",
        TextKey::Removed => "Supprimé.",
        TextKey::NotFound => "Tâche introuvable.",
        TextKey::Single => "unique",
        TextKey::Daily => "quotidien",
        TextKey::Weekly => "hebdomadaire",
        TextKey::Monthly => "mensuel",
        TextKey::Yearly => "annuel",
    }
}

fn english(key: TextKey) -> &'static str {
    match key {
        TextKey::Username => "User name",
        TextKey::Password => "Password",
        TextKey::PasswordForgotten => "Password forgotten?",
        TextKey::Wait => "Wait for server response...",
        TextKey::DoLogin => "Login",
        TextKey::Tasks => "Tasks",
        TextKey::NewTask => "New task",
        TextKey::Name => "Name",
        TextKey::Description => "Description",
        TextKey::Owner => "Owner",
        TextKey::DueDate => "Due date",
        TextKey::LastChanged => "Last changed",
        TextKey::Interval => "Interval",
        TextKey::Divisor => "Divisor",
        TextKey::StartDates => "Start dates",
        TextKey::AddDate => "Add date",
        TextKey::NextDates => "Next dates",
        TextKey::Save => "Save",
        TextKey::Remove => "Remove",
        TextKey::History => "History",
        TextKey::Attachments => "Attachments",
        TextKey::Upload => "Upload",
        TextKey::UrlName => "Label",
        TextKey::Url => "Address",
        TextKey::SaveUrl => "Save link",
        TextKey::Logout => "Logout",
        TextKey::NoTasks => "No tasks.",
        TextKey::Overdue => "Overdue",
        TextKey::Later => "Later",
        TextKey::Saved => "Saved.",
        TextKey::Removed => "Removed.",
        TextKey::NotFound => "Task not found.",
        TextKey::Single => "once",
        TextKey::Daily => "daily",
        TextKey::Weekly => "weekly",
        TextKey::Monthly => "monthly",
        TextKey::Yearly => "yearly",
    }
}
