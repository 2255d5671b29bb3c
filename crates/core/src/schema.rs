//! Patient field schema and model column order.
//!
//! Each base field has two spellings: the column header used in the training CSV (for example
//! `Heart rate`, `CK-MB`) and the underscore key used in JSON requests (`Heart_Rate`, `CK_MB`).
//! Both resolve to the same [`Field`].

/// Number of raw patient fields.
pub const FIELD_COUNT: usize = 25;

/// Number of columns the model was trained on: the raw fields plus engineered features.
pub const FEATURE_COUNT: usize = 43;

/// Model input columns, in training order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Age",
    "Cholesterol",
    "Heart rate",
    "Diabetes",
    "Family History",
    "Smoking",
    "Obesity",
    "Alcohol Consumption",
    "Exercise Hours Per Week",
    "Diet",
    "Previous Heart Problems",
    "Medication Use",
    "Stress Level",
    "Sedentary Hours Per Day",
    "Income",
    "BMI",
    "Triglycerides",
    "Physical Activity Days Per Week",
    "Sleep Hours Per Day",
    "Blood sugar",
    "CK-MB",
    "Troponin",
    "Gender",
    "Systolic blood pressure",
    "Diastolic blood pressure",
    "Lifestyle_Risk",
    "Medical_Risk",
    "Total_Risk_Score",
    "Age_BMI",
    "Age_Cholesterol",
    "Lipid_Total",
    "Pulse_Pressure",
    "Mean_Arterial_Pressure",
    "Cardiac_Biomarkers",
    "Activity_Balance",
    "Sleep_Quality",
    "Age_squared",
    "BMI_squared",
    "Cholesterol_squared",
    "Smoking_Diabetes",
    "Smoking_FamilyHistory",
    "Obesity_Diabetes",
    "Stress_Sedentary",
];

/// How a field's raw value is constrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Pre-normalised to `[0, 1]` by the caller.
    Continuous,
    /// `0` or `1`.
    Binary,
    /// Whole number in `min..=max`.
    Ordinal { min: u8, max: u8 },
    /// `"Male"` / `"Female"`, encoded as 1 / 0.
    Gender,
}

/// A raw patient field, in the order the model expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Age,
    Cholesterol,
    HeartRate,
    Diabetes,
    FamilyHistory,
    Smoking,
    Obesity,
    AlcoholConsumption,
    ExerciseHoursPerWeek,
    Diet,
    PreviousHeartProblems,
    MedicationUse,
    StressLevel,
    SedentaryHoursPerDay,
    Income,
    Bmi,
    Triglycerides,
    PhysicalActivityDaysPerWeek,
    SleepHoursPerDay,
    BloodSugar,
    CkMb,
    Troponin,
    Gender,
    SystolicBloodPressure,
    DiastolicBloodPressure,
}

impl Field {
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::Age,
        Field::Cholesterol,
        Field::HeartRate,
        Field::Diabetes,
        Field::FamilyHistory,
        Field::Smoking,
        Field::Obesity,
        Field::AlcoholConsumption,
        Field::ExerciseHoursPerWeek,
        Field::Diet,
        Field::PreviousHeartProblems,
        Field::MedicationUse,
        Field::StressLevel,
        Field::SedentaryHoursPerDay,
        Field::Income,
        Field::Bmi,
        Field::Triglycerides,
        Field::PhysicalActivityDaysPerWeek,
        Field::SleepHoursPerDay,
        Field::BloodSugar,
        Field::CkMb,
        Field::Troponin,
        Field::Gender,
        Field::SystolicBloodPressure,
        Field::DiastolicBloodPressure,
    ];

    /// Position in the model's input vector.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column header in the training dataset.
    pub fn csv_name(self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }

    /// Key used in JSON request bodies.
    pub fn json_key(self) -> &'static str {
        match self {
            Field::Age => "Age",
            Field::Cholesterol => "Cholesterol",
            Field::HeartRate => "Heart_Rate",
            Field::Diabetes => "Diabetes",
            Field::FamilyHistory => "Family_History",
            Field::Smoking => "Smoking",
            Field::Obesity => "Obesity",
            Field::AlcoholConsumption => "Alcohol_Consumption",
            Field::ExerciseHoursPerWeek => "Exercise_Hours_Per_Week",
            Field::Diet => "Diet",
            Field::PreviousHeartProblems => "Previous_Heart_Problems",
            Field::MedicationUse => "Medication_Use",
            Field::StressLevel => "Stress_Level",
            Field::SedentaryHoursPerDay => "Sedentary_Hours_Per_Day",
            Field::Income => "Income",
            Field::Bmi => "BMI",
            Field::Triglycerides => "Triglycerides",
            Field::PhysicalActivityDaysPerWeek => "Physical_Activity_Days_Per_Week",
            Field::SleepHoursPerDay => "Sleep_Hours_Per_Day",
            Field::BloodSugar => "Blood_Sugar",
            Field::CkMb => "CK_MB",
            Field::Troponin => "Troponin",
            Field::Gender => "Gender",
            Field::SystolicBloodPressure => "Systolic_Blood_Pressure",
            Field::DiastolicBloodPressure => "Diastolic_Blood_Pressure",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Diabetes
            | Field::FamilyHistory
            | Field::Smoking
            | Field::Obesity
            | Field::AlcoholConsumption
            | Field::PreviousHeartProblems
            | Field::MedicationUse => FieldKind::Binary,
            Field::Diet => FieldKind::Ordinal { min: 0, max: 2 },
            Field::StressLevel => FieldKind::Ordinal { min: 1, max: 10 },
            Field::PhysicalActivityDaysPerWeek => FieldKind::Ordinal { min: 0, max: 7 },
            Field::Gender => FieldKind::Gender,
            _ => FieldKind::Continuous,
        }
    }

    /// Fields whose empty values are replaced by the training-set mode.
    pub fn is_fillable(self) -> bool {
        matches!(
            self,
            Field::Diabetes
                | Field::FamilyHistory
                | Field::Smoking
                | Field::Obesity
                | Field::AlcoholConsumption
                | Field::PreviousHeartProblems
                | Field::MedicationUse
                | Field::StressLevel
                | Field::PhysicalActivityDaysPerWeek
        )
    }

    /// Resolve either spelling of a field name. Surrounding whitespace is ignored.
    pub fn from_name(name: &str) -> Option<Field> {
        let name = name.trim();
        Field::ALL
            .into_iter()
            .find(|f| f.csv_name() == name || f.json_key() == name)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.json_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_matches_feature_names() {
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
            assert_eq!(field.csv_name(), FEATURE_NAMES[i]);
        }
    }

    #[test]
    fn test_field_kind_counts() {
        let count = |pred: fn(FieldKind) -> bool| Field::ALL.iter().filter(|f| pred(f.kind())).count();
        assert_eq!(count(|k| k == FieldKind::Continuous), 14);
        assert_eq!(count(|k| k == FieldKind::Binary), 7);
        assert_eq!(
            count(|k| matches!(k, FieldKind::Ordinal { .. } | FieldKind::Gender)),
            4
        );
    }

    #[test]
    fn test_from_name_accepts_both_spellings() {
        assert_eq!(Field::from_name("Heart rate"), Some(Field::HeartRate));
        assert_eq!(Field::from_name("Heart_Rate"), Some(Field::HeartRate));
        assert_eq!(Field::from_name(" CK-MB "), Some(Field::CkMb));
        assert_eq!(Field::from_name("CK_MB"), Some(Field::CkMb));
        assert_eq!(Field::from_name("heart rate"), None);
        assert_eq!(Field::from_name("id"), None);
    }

    #[test]
    fn test_fillable_fields() {
        let fillable: Vec<_> = Field::ALL.into_iter().filter(|f| f.is_fillable()).collect();
        assert_eq!(fillable.len(), 9);
        assert!(fillable.contains(&Field::StressLevel));
        assert!(!fillable.contains(&Field::Gender));
    }

    #[test]
    fn test_feature_names_are_unique() {
        let mut names = FEATURE_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FEATURE_COUNT);
    }
}
