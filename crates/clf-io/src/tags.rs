//! Element and attribute names used by CLF/CTF and the ASC CDL schemas.

pub const TAG_PROCESS_LIST: &str = "ProcessList";
pub const TAG_INFO: &str = "Info";
pub const TAG_DESCRIPTION: &str = "Description";
pub const TAG_INPUT_DESCRIPTOR: &str = "InputDescriptor";
pub const TAG_OUTPUT_DESCRIPTOR: &str = "OutputDescriptor";

pub const TAG_ACES: &str = "ACES";
pub const TAG_ACES_PARAMS: &str = "ACESParams";
pub const TAG_CDL: &str = "ASC_CDL";
pub const TAG_EXPOSURE_CONTRAST: &str = "ExposureContrast";
pub const TAG_EC_PARAMS: &str = "ECParams";
pub const TAG_FIXED_FUNCTION: &str = "FixedFunction";
pub const TAG_FUNCTION: &str = "Function";
pub const TAG_GAMMA: &str = "Gamma";
pub const TAG_EXPONENT: &str = "Exponent";
pub const TAG_GAMMA_PARAMS: &str = "GammaParams";
pub const TAG_EXPONENT_PARAMS: &str = "ExponentParams";
pub const TAG_GRADING_PRIMARY: &str = "GradingPrimary";
pub const TAG_GRADING_RGB_CURVE: &str = "GradingRGBCurve";
pub const TAG_GRADING_TONE: &str = "GradingTone";
pub const TAG_INVLUT1D: &str = "InverseLUT1D";
pub const TAG_INVLUT3D: &str = "InverseLUT3D";
pub const TAG_LOG: &str = "Log";
pub const TAG_LOG_PARAMS: &str = "LogParams";
pub const TAG_LUT1D: &str = "LUT1D";
pub const TAG_LUT3D: &str = "LUT3D";
pub const TAG_MATRIX: &str = "Matrix";
pub const TAG_RANGE: &str = "Range";
pub const TAG_REFERENCE: &str = "Reference";

pub const TAG_ARRAY: &str = "Array";
pub const TAG_INDEX_MAP: &str = "IndexMap";
pub const TAG_DYNAMIC_PARAMETER: &str = "DynamicParameter";

pub const TAG_MIN_IN_VALUE: &str = "minInValue";
pub const TAG_MAX_IN_VALUE: &str = "maxInValue";
pub const TAG_MIN_OUT_VALUE: &str = "minOutValue";
pub const TAG_MAX_OUT_VALUE: &str = "maxOutValue";

pub const TAG_SOPNODE: &str = "SOPNode";
pub const TAG_SATNODE: &str = "SatNode";
pub const TAG_SATNODE_ALT: &str = "SATNode";
pub const TAG_SLOPE: &str = "Slope";
pub const TAG_OFFSET: &str = "Offset";
pub const TAG_POWER: &str = "Power";
pub const TAG_SATURATION: &str = "Saturation";

pub const TAG_PRIMARY_BRIGHTNESS: &str = "Brightness";
pub const TAG_PRIMARY_CONTRAST: &str = "Contrast";
pub const TAG_PRIMARY_GAMMA: &str = "Gamma";
pub const TAG_PRIMARY_OFFSET: &str = "Offset";
pub const TAG_PRIMARY_EXPOSURE: &str = "Exposure";
pub const TAG_PRIMARY_LIFT: &str = "Lift";
pub const TAG_PRIMARY_GAIN: &str = "Gain";
pub const TAG_PRIMARY_PIVOT: &str = "Pivot";
pub const TAG_PRIMARY_SATURATION: &str = "Saturation";
pub const TAG_PRIMARY_CLAMP: &str = "Clamp";

pub const TAG_TONE_BLACKS: &str = "Blacks";
pub const TAG_TONE_SHADOWS: &str = "Shadows";
pub const TAG_TONE_MIDTONES: &str = "Midtones";
pub const TAG_TONE_HIGHLIGHTS: &str = "Highlights";
pub const TAG_TONE_WHITES: &str = "Whites";
pub const TAG_TONE_SCONTRAST: &str = "SContrast";

pub const TAG_CURVE_RED: &str = "Red";
pub const TAG_CURVE_GREEN: &str = "Green";
pub const TAG_CURVE_BLUE: &str = "Blue";
pub const TAG_CURVE_MASTER: &str = "Master";
pub const TAG_CURVE_CONTROL_POINTS: &str = "ControlPoints";
pub const TAG_CURVE_SLOPES: &str = "Slopes";

pub const CDL_TAG_COLOR_DECISION_LIST: &str = "ColorDecisionList";
pub const CDL_TAG_COLOR_CORRECTION_COLLECTION: &str = "ColorCorrectionCollection";
pub const CDL_TAG_COLOR_CORRECTION: &str = "ColorCorrection";
pub const CDL_TAG_COLOR_DECISION: &str = "ColorDecision";
pub const CDL_TAG_MEDIA_REF: &str = "MediaRef";
pub const CDL_TAG_INPUT_DESCRIPTION: &str = "InputDescription";
pub const CDL_TAG_VIEWING_DESCRIPTION: &str = "ViewingDescription";

pub const ATTR_ID: &str = "id";
pub const ATTR_NAME: &str = "name";
pub const ATTR_INVERSE_OF: &str = "inverseOf";
pub const ATTR_VERSION: &str = "version";
pub const ATTR_COMP_CLF_VERSION: &str = "compCLFversion";
pub const ATTR_IN_BIT_DEPTH: &str = "inBitDepth";
pub const ATTR_OUT_BIT_DEPTH: &str = "outBitDepth";
pub const ATTR_STYLE: &str = "style";
pub const ATTR_PARAMS: &str = "params";
pub const ATTR_DIMENSION: &str = "dim";
pub const ATTR_INTERPOLATION: &str = "interpolation";
pub const ATTR_HALF_DOMAIN: &str = "halfDomain";
pub const ATTR_RAW_HALFS: &str = "rawHalfs";
pub const ATTR_HUE_ADJUST: &str = "hueAdjust";
pub const ATTR_CHANNEL: &str = "channel";
pub const ATTR_PARAM: &str = "param";
pub const ATTR_PATH: &str = "path";
pub const ATTR_BASE_PATH: &str = "basePath";
pub const ATTR_ALIAS: &str = "alias";
pub const ATTR_INVERTED: &str = "inverted";
pub const ATTR_BYPASS_LIN_TO_LOG: &str = "bypassLinToLog";

pub const ATTR_GAMMA: &str = "gamma";
pub const ATTR_REF_WHITE: &str = "refWhite";
pub const ATTR_REF_BLACK: &str = "refBlack";
pub const ATTR_HIGHLIGHT: &str = "highlight";
pub const ATTR_SHADOW: &str = "shadow";
pub const ATTR_BASE: &str = "base";
pub const ATTR_LIN_SIDE_SLOPE: &str = "linSideSlope";
pub const ATTR_LIN_SIDE_OFFSET: &str = "linSideOffset";
pub const ATTR_LOG_SIDE_SLOPE: &str = "logSideSlope";
pub const ATTR_LOG_SIDE_OFFSET: &str = "logSideOffset";
pub const ATTR_LIN_SIDE_BREAK: &str = "linSideBreak";
pub const ATTR_LINEAR_SLOPE: &str = "linearSlope";

pub const ATTR_EXPOSURE: &str = "exposure";
pub const ATTR_CONTRAST: &str = "contrast";
pub const ATTR_PIVOT: &str = "pivot";
pub const ATTR_LOG_EXPOSURE_STEP: &str = "logExposureStep";
pub const ATTR_LOG_MID_GRAY: &str = "logMidGray";

pub const ATTR_RGB: &str = "rgb";
pub const ATTR_MASTER: &str = "master";
pub const ATTR_BLACK: &str = "black";
pub const ATTR_WHITE: &str = "white";
pub const ATTR_START: &str = "start";
pub const ATTR_WIDTH: &str = "width";
pub const ATTR_CENTER: &str = "center";
