use serde::{Deserialize, Serialize};

/// Reminder languages offered to the office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    Hindi,
    Marathi,
    Maithili,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::English,
        Language::Hindi,
        Language::Marathi,
        Language::Maithili,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Marathi => "Marathi",
            Language::Maithili => "Maithili",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    #[default]
    StandardReminder,
    JuniorFriendly,
    SeniorStrict,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 3] = [
        TemplateKind::StandardReminder,
        TemplateKind::JuniorFriendly,
        TemplateKind::SeniorStrict,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TemplateKind::StandardReminder => "Standard Reminder",
            TemplateKind::JuniorFriendly => "Junior Student Friendly",
            TemplateKind::SeniorStrict => "Senior Section Strict",
        }
    }
}

const JUNIOR_CLASSES: [&str; 8] = ["Nursery", "KG", "Prep", "1", "2", "3", "4", "5"];
const SENIOR_CLASSES: [&str; 4] = ["9", "10", "11", "12"];

/// Coarse class grouping used to pick a reminder tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassBracket {
    Junior,
    Senior,
    Other,
}

impl ClassBracket {
    pub fn of(class: &str) -> Self {
        let class = class.trim();
        let matches = |known: &[&str]| known.iter().any(|name| name.eq_ignore_ascii_case(class));
        if matches(&JUNIOR_CLASSES) {
            ClassBracket::Junior
        } else if matches(&SENIOR_CLASSES) {
            ClassBracket::Senior
        } else {
            ClassBracket::Other
        }
    }
}

/// Decides which template a record receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateSelector {
    pub operator_choice: TemplateKind,
    /// When set, junior and senior classes always get their bracket template.
    pub bracket_override: bool,
}

impl TemplateSelector {
    pub fn new(operator_choice: TemplateKind, bracket_override: bool) -> Self {
        Self {
            operator_choice,
            bracket_override,
        }
    }

    pub fn resolve(&self, class: &str) -> TemplateKind {
        if !self.bracket_override {
            return self.operator_choice;
        }
        match ClassBracket::of(class) {
            ClassBracket::Junior => TemplateKind::JuniorFriendly,
            ClassBracket::Senior => TemplateKind::SeniorStrict,
            ClassBracket::Other => self.operator_choice,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTemplate {
    pub subject: &'static str,
    pub body: &'static str,
}

/// Placeholder values; each `{name}` in a template maps to one field.
#[derive(Debug, Clone, Copy)]
pub struct TemplateValues<'a> {
    pub student_name: &'a str,
    pub student_class: &'a str,
    pub due_amount: &'a str,
    pub school_name: &'a str,
}

impl<'a> TemplateValues<'a> {
    fn lookup(&self, placeholder: &str) -> Option<&'a str> {
        match placeholder {
            "student_name" => Some(self.student_name),
            "student_class" => Some(self.student_class),
            "due_amount" => Some(self.due_amount),
            "school_name" => Some(self.school_name),
            _ => None,
        }
    }
}

/// Substitute `{student_name}`, `{student_class}`, `{due_amount}` and `{school_name}` in one
/// pass; substituted values are never expanded again. Unknown placeholders are left as written.
pub fn render_template(text: &str, values: &TemplateValues<'_>) -> String {
    let mut rendered = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        rest = &rest[open..];
        let Some(close) = rest.find('}') else {
            break;
        };
        match values.lookup(&rest[1..close]) {
            Some(value) => {
                rendered.push_str(value);
                rest = &rest[close + 1..];
            }
            None => {
                rendered.push('{');
                rest = &rest[1..];
            }
        }
    }
    rendered.push_str(rest);
    rendered
}

pub const DEFAULT_SMS_TEMPLATE: &str = "Dear Parent, Fee due for {student_name} (Class {student_class}): ₹{due_amount}. Please pay soon. - {school_name}";

pub fn template(language: Language, kind: TemplateKind) -> MessageTemplate {
    match (language, kind) {
        (Language::English, TemplateKind::StandardReminder) => MessageTemplate {
            subject: "Urgent: Fee Due Reminder for {student_name}",
            body: "Dear Parent/Guardian,

This is a reminder that the school fee for your child, **{student_name}**, studying in Class **{student_class}**, is still unpaid.

🧾 **Outstanding Amount**: ₹{due_amount}

Please clear the dues at the earliest to avoid a **daily penalty**. Timely payment ensures your child continues to receive academic support.

If you've already paid, kindly ignore this message.

Warm regards,
**{school_name}**
",
        },
        (Language::English, TemplateKind::JuniorFriendly) => MessageTemplate {
            subject: "Fee Reminder for {student_name} (Junior Section)",
            body: "Dear Parent,

We hope your little one, **{student_name}** (Class **{student_class}**), is enjoying their learning journey with us!

Our records show a pending fee of **₹{due_amount}**. Kindly clear the dues soon to ensure uninterrupted participation in school activities.

Thank you for your prompt attention.

Best wishes,
**{school_name}**
",
        },
        (Language::English, TemplateKind::SeniorStrict) => MessageTemplate {
            subject: "Final Notice: Fee Due for {student_name} (Senior Section)",
            body: "Dear Parent/Guardian,

This is a final reminder regarding the outstanding fee for **{student_name}** (Class **{student_class}**).

🧾 **Amount Due**: ₹{due_amount}

Immediate payment is required to avoid further action. Please disregard this notice if payment has already been made.

Sincerely,
**{school_name}**
",
        },
        (Language::Hindi, TemplateKind::StandardReminder) => MessageTemplate {
            subject: "महत्वपूर्ण: {student_name} के लिए शुल्क बकाया सूचना",
            body: "आदरणीय अभिभावक,

आपके बच्चे **{student_name}** (कक्षा **{student_class}**) की स्कूल फीस अभी बकाया है।

🧾 **बकाया राशि**: ₹{due_amount}

कृपया शीघ्र भुगतान करें। धन्यवाद।
**{school_name}**
",
        },
        (Language::Hindi, TemplateKind::JuniorFriendly) => MessageTemplate {
            subject: "शुल्क याददाश्त: {student_name} (जूनियर सेक्शन)",
            body: "प्रिय अभिभावक,

हमें आशा है कि आपका बच्चा, **{student_name}** (कक्षा **{student_class}**), हमारे साथ अपनी सीखने की यात्रा का आनंद ले रहा है!

हमारे रिकॉर्ड के अनुसार, **₹{due_amount}** की एक बकाया राशि है। कृपया सुनिश्चित करें कि शुल्क जल्द से जल्द भरा जाए ताकि स्कूल गतिविधियों में कोई रुकावट न आए।

आपकी त्वरित ध्यान देने के लिए धन्यवाद।

सादर,
**{school_name}**
",
        },
        (Language::Hindi, TemplateKind::SeniorStrict) => MessageTemplate {
            subject: "अंतिम सूचना: {student_name} के लिए शुल्क बकाया (सीनियर सेक्शन)",
            body: "प्रिय अभिभावक/अभिभाविका,

यह **{student_name}** (कक्षा **{student_class}**) के लिए बकाया शुल्क के संबंध में अंतिम अनुस्मारक है।

🧾 **बकाया राशि**: ₹{due_amount}

कृपया ध्यान दें कि तत्काल भुगतान आवश्यक है अन्यथा आगे की कार्रवाई की जा सकती है। यदि आपने पहले ही भुगतान कर दिया है, तो कृपया इस सूचना को नजरअंदाज करें।

सादर,
**{school_name}**
",
        },
        (Language::Marathi, TemplateKind::StandardReminder) => MessageTemplate {
            subject: "{student_name} साठी शुल्क थकबाकीची सूचना",
            body: "आदरणीय पालक,

आपल्या मुलाचे **{student_name}** (इयत्ता **{student_class}**) शाळेचे शुल्क थकबाकी आहे.

🧾 **थकबाकी रक्कम**: ₹{due_amount}

कृपया लवकरात लवकर शुल्क भरा. धन्यवाद.
**{school_name}**
",
        },
        (Language::Marathi, TemplateKind::JuniorFriendly) => MessageTemplate {
            subject: "शुल्क याददाश्त: {student_name} (जूनियर सेक्शन)",
            body: "प्रिय पालक,

आपल्या लहानग्या मित्रा/मित्रिणीचा, **{student_name}** (इयत्ता **{student_class}**), आमच्यासोबत शिकण्याच्या प्रवासाचा आनंद घेत असल्याची आशा आहे!

आमच्या रेकॉर्डनुसार, **₹{due_amount}** ची एक थकबाकी रक्कम आहे. कृपया लवकरात लवकर थकबाकी भरण्यासाठी सुनिश्चित करा जेणेकरून शाळेच्या क्रियाकलापांमध्ये कोणतीही अडचण येऊ नये.

आपल्या त्वरित लक्षासाठी धन्यवाद.

सादर,
**{school_name}**
",
        },
        (Language::Marathi, TemplateKind::SeniorStrict) => MessageTemplate {
            subject: "अंतिम सूचना: {student_name} साठी शुल्क थकबाकी (सीनियर सेक्शन)",
            body: "प्रिय पालक/पालकिणी,

ही **{student_name}** (इयत्ता **{student_class}**) साठी थकबाकी शुल्काबद्दलची अंतिम सूचना आहे.

🧾 **बकाया रक्कम**: ₹{due_amount}

कृपया तात्काळ भुगतान आवश्यक आहे अन्यथा पुढील कारवाई केली जाईल. जर आपण आधीच भुगतान केले असेल, तर कृपया या सूचनेकडे दुर्लक्ष करा.

सादर,
**{school_name}**
",
        },
        (Language::Maithili, TemplateKind::StandardReminder) => MessageTemplate {
            subject: "जरूरी: {student_name} लेल फीस बकाया सूचना",
            body: "आदरणीय अभिभावक,

अहाँक बच्चा **{student_name}** (कक्षा **{student_class}**) केर स्कूल फीस अबधि तक जमा नै भेल अछि।

🧾 **बकाया राशि**: ₹{due_amount}

कृपया शीघ्र फीस जमा करू। धन्यवाद।
**{school_name}**
",
        },
        (Language::Maithili, TemplateKind::JuniorFriendly) => MessageTemplate {
            subject: "फीस स्मरण: {student_name} (जूनियर सेक्शन)",
            body: "प्रिय अभिभावक,

आशा अछि जे अहाँक बच्चा, **{student_name}** (कक्षा **{student_class}**), स्कूल में पढ़ाई के आनंद ल' रहल छथि!

हमर रिकॉर्ड अनुसार, **₹{due_amount}** के बकाया राशि अछि। कृपया शीघ्र फीस जमा करू ताकि स्कूल गतिविधि में बाधा नै आबय।

अहाँक त्वरित ध्यान लेल धन्यवाद।

सादर,
**{school_name}**
",
        },
        (Language::Maithili, TemplateKind::SeniorStrict) => MessageTemplate {
            subject: "अंतिम सूचना: {student_name} लेल फीस बकाया (सीनियर सेक्शन)",
            body: "प्रिय अभिभावक,

ई अंतिम सूचना अछि जे **{student_name}** (कक्षा **{student_class}**) केर फीस बकाया अछि।

🧾 **बकाया राशि**: ₹{due_amount}

कृपया तुरंत फीस जमा करू, अन्यथा अगिला कार्रवाई कएल जा सकैत अछि। यदि अहाँ फीस जमा क' चुकल छी, त' कृपया ई सूचना नजरअंदाज करू।

सादर,
**{school_name}**
",
        },
    }
}
